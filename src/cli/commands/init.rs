//! Init command - Generate an example suite file

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;
use tracing::info;

pub const EXAMPLE_SUITE: &str = r#"# apiprobe suite
#
# The test call is the "acceptable" request: every generated case is a small
# variation of it. Predo runs before each case, undo after it.

# Fields that must always carry the same value
matching = [["password", "password_confirmation"]]

[endpoint]
base_url = "http://localhost:3000/api"

[endpoint.predo]
method = "POST"
url = "/users"
body = { name = "Ann Example", email = "ann@example.com", password = "Secret123!", password_confirmation = "Secret123!", age = 30 }

[endpoint.test]
method = "PUT"
url = "/users/<id>"
url_ids = [{ "$ref" = { source = "predo", component = "response", location = "_id" } }]
# Replay the acceptable request when a group ends on a failed case
final_undo = false

[endpoint.test.headers]
X-Auth-Token = { "$ref" = { source = "predo", component = "response", location = "token" } }

[endpoint.test.body]
name = "Bob Example"
email = "bob@example.com"
password = "Secret456!"
password_confirmation = "Secret456!"
age = 31
roles = ["reader"]

[endpoint.undo]
method = "DELETE"
url = "/users/<id>"
url_ids = [{ "$ref" = { source = "predo", component = "response", location = "_id" } }]
# "always" or "after_success"
on_success = "always"

[[fields]]
name = "name"
type = "string"

[[fields]]
name = "email"
type = "email"
parameters = { existing_email = "taken@example.com" }

[[fields]]
name = "password"
type = "password"
parameters = { min_length = 8, upper_case = true, number = true }

[[fields]]
name = "password_confirmation"
type = "password_confirmation"

[[fields]]
name = "age"
type = "integer"
parameters = { min = 18, max = 130 }

[[fields]]
name = "roles"
type = "array"
array_type = "string"
parameters = { choices = ["reader", "writer", "admin"], excluded = "root", duplicates = false }

[[custom_inputs]]
name = "empty body"
expected_success = false
body = {}

[options]
sample_size = 3
timeout_secs = 30
"#;

pub fn run(output: &str, force: bool) -> Result<()> {
    info!("Generating suite file: {}", output);

    let path = Path::new(output);

    if path.exists() && !force {
        bail!(
            "Suite file already exists: {}. Use --force to overwrite.",
            output
        );
    }

    fs::write(path, EXAMPLE_SUITE).with_context(|| format!("Failed to write {output}"))?;

    println!("{}", "✓ Suite file created".green());
    println!("  Location: {}", output.yellow());
    println!();
    println!("Next steps:");
    println!("  1. Point base_url at your API and adjust the calls");
    println!("  2. Review the generated cases: apiprobe plan {output}");
    println!("  3. Run them: apiprobe run {output}");

    Ok(())
}
