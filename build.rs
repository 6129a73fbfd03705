use std::fs;

fn main() {
    // Validate the compiled-in config at build time
    let config_path = "src/default_config.toml";
    println!("cargo:rerun-if-changed={}", config_path);

    let content = fs::read_to_string(config_path).expect("Failed to read default_config.toml");

    let table = match content.parse::<toml::Table>() {
        Ok(table) => table,
        Err(e) => panic!("Invalid default_config.toml: {}", e),
    };

    let Some(default_profile) = table.get("default_profile").and_then(|v| v.as_str()) else {
        panic!("default_config.toml must set default_profile");
    };
    let has_profile = table
        .get("profiles")
        .and_then(|p| p.as_table())
        .is_some_and(|profiles| profiles.contains_key(default_profile));
    if !has_profile {
        panic!("default_config.toml: default_profile `{default_profile}` has no [profiles] entry");
    }
}
