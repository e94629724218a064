#![allow(dead_code)]
use std::fs;
use std::path::{Path, PathBuf};

use std::sync::Once;

static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}

pub const DECLARATION: &str = r#"<?xml version="1.0"?>"#;

pub fn samples_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("samples")
        .canonicalize()
        .unwrap()
}

/// A time-profile, a potential-hangs and an (unsupported) region-of-interest table.
pub fn demo_app_sample() -> PathBuf {
    samples_dir().join("demo-app.xml")
}

/// Renders one exported table the way `xctrace export` writes it: a declaration, then a
/// `<trace-query-result>` holding the schema and the rows.
pub fn table_fragment(schema_name: &str, columns: &[(&str, &str)], rows: &[&str]) -> String {
    let mut out = String::new();
    out.push_str(DECLARATION);
    out.push_str("\n<trace-query-result>\n<node>");
    out.push_str(&format!("<schema name=\"{}\">\n", schema_name));

    for (name, engineering_type) in columns {
        out.push_str(&format!(
            "<col><mnemonic>{}</mnemonic><name>{}</name><engineering-type>{}</engineering-type></col>\n",
            engineering_type, name, engineering_type
        ));
    }
    out.push_str("</schema>\n");

    for row in rows {
        out.push_str(&format!("<row>{}</row>\n", row));
    }

    out.push_str("</node></trace-query-result>\n");
    out
}

pub fn write_capture(dir: &Path, file_name: &str, fragments: &[String]) -> PathBuf {
    let path = dir.join(file_name);
    fs::write(&path, fragments.concat()).unwrap();
    path
}
