use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const KEY_PREFIX: &str = "SQL2ES_";
const TEST_MODULE_MARKER: &str = "#[cfg(test)]";

fn collect_rs_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_rs_files(&path, out)?;
        } else if path.extension().and_then(|ext| ext.to_str()) == Some("rs") {
            out.push(path);
        }
    }
    Ok(())
}

/// A setting is a string literal that is exactly `SQL2ES_<NAME>`, such as
/// `env::var("SQL2ES_HOME")`. Log prefixes and messages that merely mention
/// a key are longer literals and do not count; neither does test code.
fn collect_setting_keys(source: &str, out: &mut BTreeSet<String>) {
    let runtime = source
        .find(TEST_MODULE_MARKER)
        .map_or(source, |idx| &source[..idx]);
    let needle = format!("\"{KEY_PREFIX}");
    let mut rest = runtime;
    while let Some(start) = rest.find(&needle) {
        let literal = &rest[start + 1..];
        let len = literal
            .bytes()
            .take_while(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || *b == b'_')
            .count();
        if len > KEY_PREFIX.len() && literal[len..].starts_with('"') {
            out.insert(literal[..len].to_string());
        }
        rest = &literal[len..];
    }
}

fn write_env_keys(out_dir: &Path) -> std::io::Result<()> {
    let mut rs_files = Vec::new();
    collect_rs_files(Path::new("src"), &mut rs_files)?;
    rs_files.sort();

    let mut keys = BTreeSet::new();
    for file in &rs_files {
        collect_setting_keys(&fs::read_to_string(file)?, &mut keys);
        println!("cargo:rerun-if-changed={}", file.display());
    }

    let mut f = fs::File::create(out_dir.join("env_keys.rs"))?;
    writeln!(f, "pub const RECOGNISED_ENV_KEYS: &[&str] = &[")?;
    for key in keys {
        writeln!(f, "    \"{key}\",")?;
    }
    writeln!(f, "];")?;
    Ok(())
}

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    write_env_keys(&out_dir).expect("failed to generate recognised SQL2ES_* keys");

    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    println!(
        "cargo:rustc-env=BUILD_UUID={:x}-{:x}",
        now.as_secs(),
        now.subsec_nanos()
    );
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src");
}
