//! Test case generation
//!
//! Pure functions from a field descriptor (or the endpoint-wide rules) to an
//! ordered list of cases. Every generator also has an independent count
//! function; the runner compares the two after each block.

mod baseline;
pub mod boundary;
pub mod email;
mod general;
pub mod matching;
pub mod password;
pub mod values;

use std::fmt;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::ProbeError;
use crate::reference::{SpecMap, ValueSpec};
use crate::schema::{FieldDescriptor, FieldType, MatchingSets, Suite, DEFAULT_SAMPLE_SIZE};

use self::baseline::Baseline;
use self::email::{email_variants, EMAIL_VARIANTS};

pub use general::{expected_general_count, general_cases};

/// Field label for cases not tied to a body field
pub const GENERAL_FIELD: &str = "**general**";

/// Which group produced a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseSource {
    General,
    Field,
    CustomInput,
    CustomHook,
}

impl fmt::Display for CaseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseSource::General => write!(f, "general tests"),
            CaseSource::Field => write!(f, "field tests"),
            CaseSource::CustomInput => write!(f, "custom inputs"),
            CaseSource::CustomHook => write!(f, "custom hooks"),
        }
    }
}

/// Whether a case issues requests or carries a precomputed verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseKind {
    Request,
    Check { passed: bool },
}

/// One generated test case
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub name: String,
    pub field: String,
    pub expected_success: bool,
    pub kind: CaseKind,
    /// Replaces the test call's headers for this case only
    pub header_override: Option<SpecMap>,
    /// Replaces the test call's body for this case only
    pub body_override: Option<SpecMap>,
    /// Replaces the test call's url ids for this case only
    pub url_ids_override: Option<Vec<ValueSpec>>,
    /// Replaces the test call's url template for this case only
    pub url_template_override: Option<String>,
    pub error_message: String,
    pub source: CaseSource,
}

impl TestCase {
    /// A request case; field and source are filled in by the producer
    pub fn request(
        name: impl Into<String>,
        expected_success: bool,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field: String::new(),
            expected_success,
            kind: CaseKind::Request,
            header_override: None,
            body_override: None,
            url_ids_override: None,
            url_template_override: None,
            error_message: error_message.into(),
            source: CaseSource::Field,
        }
    }

    /// A non-request check with a known verdict
    pub fn check(name: impl Into<String>, passed: bool, error_message: impl Into<String>) -> Self {
        Self {
            kind: CaseKind::Check { passed },
            ..Self::request(name, false, error_message)
        }
    }

    pub fn in_field(mut self, field: impl Into<String>, source: CaseSource) -> Self {
        self.field = field.into();
        self.source = source;
        self
    }

    pub fn with_header(mut self, header: SpecMap) -> Self {
        self.header_override = Some(header);
        self
    }

    pub fn with_body(mut self, body: SpecMap) -> Self {
        self.body_override = Some(body);
        self
    }

    pub fn with_url_ids(mut self, ids: Vec<ValueSpec>) -> Self {
        self.url_ids_override = Some(ids);
        self
    }

    pub fn with_url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template_override = Some(template.into());
        self
    }

    pub fn is_check(&self) -> bool {
        matches!(self.kind, CaseKind::Check { .. })
    }
}

/// Collects cases for one field, stamping field and source
pub(crate) struct CaseSink<'a> {
    field: &'a str,
    cases: Vec<TestCase>,
}

impl<'a> CaseSink<'a> {
    fn new(field: &'a str) -> Self {
        Self {
            field,
            cases: Vec::new(),
        }
    }

    pub fn field_name(&self) -> &str {
        self.field
    }

    pub fn push(&mut self, case: TestCase) {
        self.cases.push(case.in_field(self.field, CaseSource::Field));
    }
}

/// Inputs shared by every field generator
#[derive(Debug, Clone)]
pub struct GeneratorContext {
    pub matching: MatchingSets,
    pub delete_value: Option<Value>,
    pub delete_test: bool,
    pub sample_size: usize,
    pub seed: u64,
}

impl Default for GeneratorContext {
    fn default() -> Self {
        Self {
            matching: MatchingSets::default(),
            delete_value: None,
            delete_test: false,
            sample_size: DEFAULT_SAMPLE_SIZE,
            seed: 0,
        }
    }
}

impl GeneratorContext {
    pub fn from_suite(suite: &Suite, seed: u64) -> Self {
        Self {
            matching: suite.matching.clone(),
            delete_value: suite.options.delete_value.clone(),
            delete_test: suite.endpoint.test.delete_field_test,
            sample_size: suite.options.sample_size,
            seed,
        }
    }

    pub fn with_matching(mut self, matching: MatchingSets) -> Self {
        self.matching = matching;
        self
    }

    pub fn with_delete_test(mut self, marker: impl Into<Value>) -> Self {
        self.delete_value = Some(marker.into());
        self.delete_test = true;
        self
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Per-field RNG so reordering fields does not change their samples
    fn rng_for(&self, field: &str) -> SmallRng {
        let hash = field
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
                (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
            });
        SmallRng::seed_from_u64(self.seed ^ hash)
    }
}

/// Number of cases `field_cases` produces for `field`
pub fn expected_field_count(field: &FieldDescriptor, ctx: &GeneratorContext) -> usize {
    let params = &field.parameters;
    let mut count = 5;
    count += usize::from(ctx.delete_test);
    count += if params.min.is_some() { 3 } else { 0 };
    count += if params.max.is_some() { 3 } else { 0 };
    if field.field_type == FieldType::Email {
        count += EMAIL_VARIANTS + usize::from(params.existing_email.is_some());
    }
    count += ctx.matching.sets_containing(&field.name).count();
    if field.field_type == FieldType::Password {
        count += password::expected_count(params);
    }
    count + values::expected_count(field, ctx.sample_size)
}

/// Ordered cases for one field
///
/// `test_body` is the test call body, used when the field declares no
/// baseline of its own.
pub fn field_cases(
    field: &FieldDescriptor,
    test_body: &SpecMap,
    ctx: &GeneratorContext,
) -> Result<Vec<TestCase>, ProbeError> {
    let name = field.name.as_str();
    let params = &field.parameters;
    let body = field.baseline_body.as_ref().unwrap_or(test_body);
    let baseline = Baseline::new(body, name, &ctx.matching.partners(name))?;
    let mut sink = CaseSink::new(name);

    // Schema sanity, no requests
    let present = baseline.contains_field() || !field.required || field.has_default;
    sink.push(TestCase::check(
        "field in baseline body",
        present,
        format!("required field '{name}' missing from the baseline body"),
    ));
    sink.push(TestCase::check(
        "recognized type",
        true,
        format!("type {} is not recognized", field.field_type),
    ));

    sink.push(
        TestCase::request("acceptable input", true, "baseline body rejected")
            .with_body(baseline.body().clone()),
    );
    sink.push(
        TestCase::request("null value", false, format!("null accepted for {name}"))
            .with_body(baseline.with_value(&Value::Null)),
    );

    let optional = !field.required || field.has_default;
    let omitted_error = if optional {
        format!("request rejected without optional field {name}")
    } else {
        format!("request accepted without required field {name}")
    };
    sink.push(
        TestCase::request("field omitted", optional, omitted_error)
            .with_body(baseline.without_value()),
    );

    if ctx.delete_test {
        let marker = ctx.delete_value.clone().ok_or_else(|| {
            ProbeError::schema("delete test enabled without a delete marker")
        })?;
        let error = if field.deletable {
            format!("{name} could not be deleted with {marker}")
        } else {
            format!("delete marker {marker} accepted for non-deletable {name}")
        };
        sink.push(
            TestCase::request("delete marker", field.deletable, error)
                .with_body(baseline.with_value(&marker)),
        );
    }

    if let Some(min) = &params.min {
        let inclusive = params.min_inclusive();
        let below = boundary::shift(min, -1, field)?;
        let at = boundary::shift(min, 0, field)?;
        let above = boundary::shift(min, 1, field)?;
        let at_error = if inclusive {
            format!("min bound {at} rejected (inclusive)")
        } else {
            format!("min bound {at} accepted (exclusive)")
        };
        sink.push(
            TestCase::request("min: below boundary", false, format!("{below} below min accepted"))
                .with_body(baseline.with_value(&below)),
        );
        sink.push(
            TestCase::request("min: on boundary", inclusive, at_error)
                .with_body(baseline.with_value(&at)),
        );
        sink.push(
            TestCase::request("min: above boundary", true, format!("{above} above min rejected"))
                .with_body(baseline.with_value(&above)),
        );
    }

    if let Some(max) = &params.max {
        let inclusive = params.max_inclusive();
        let above = boundary::shift(max, 1, field)?;
        let at = boundary::shift(max, 0, field)?;
        let below = boundary::shift(max, -1, field)?;
        let at_error = if inclusive {
            format!("max bound {at} rejected (inclusive)")
        } else {
            format!("max bound {at} accepted (exclusive)")
        };
        sink.push(
            TestCase::request("max: above boundary", false, format!("{above} above max accepted"))
                .with_body(baseline.with_value(&above)),
        );
        sink.push(
            TestCase::request("max: on boundary", inclusive, at_error)
                .with_body(baseline.with_value(&at)),
        );
        sink.push(
            TestCase::request("max: below boundary", true, format!("{below} below max rejected"))
                .with_body(baseline.with_value(&below)),
        );
    }

    if field.field_type == FieldType::Email {
        for (address, valid) in email_variants() {
            let error = if valid {
                format!("well-formed address '{address}' rejected")
            } else {
                format!("malformed address '{address}' accepted")
            };
            sink.push(
                TestCase::request("email format", valid, error)
                    .with_body(baseline.with_value(&json!(address))),
            );
        }
        if let Some(existing) = &params.existing_email {
            sink.push(
                TestCase::request(
                    "email already registered",
                    false,
                    format!("duplicate address '{existing}' accepted"),
                )
                .with_body(baseline.with_value(&json!(existing))),
            );
        }
    }

    let matching_sets: Vec<_> = ctx.matching.sets_containing(name).collect();
    if !matching_sets.is_empty() {
        let current = baseline.current()?;
        let diverged = matching::divergent_value(field, &current)?;
        for set in matching_sets {
            sink.push(
                TestCase::request(
                    "matching values differ",
                    false,
                    format!("{name} = {diverged} accepted while its partners in {set:?} kept {current}"),
                )
                .with_body(baseline.with_value_alone(&diverged)),
            );
        }
    }

    if field.field_type == FieldType::Password {
        password::push_cases(&mut sink, &baseline, params)?;
    }

    if field.field_type == FieldType::Array {
        let mut rng = ctx.rng_for(name);
        values::push_array_cases(&mut sink, &baseline, field, ctx.sample_size, &mut rng)?;
    } else {
        values::push_scalar_cases(&mut sink, &baseline, field);
    }

    Ok(sink.cases)
}
