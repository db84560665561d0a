use std::path::Path;

fn main() {
    let catalog_path = Path::new("catalogs/default_tools.json");
    validate_catalog_file(catalog_path);
    set_build_dependencies();
}

fn validate_catalog_file(catalog_path: &Path) {
    // Ensure the bundled catalog exists at build time
    assert!(
        catalog_path.exists(),
        "\n\nCATALOG BUILD ERROR: File not found\n\
         Path: {}\n\
         Please create the default catalog before building.\n",
        catalog_path.display()
    );

    let catalog_contents = std::fs::read_to_string(catalog_path).unwrap_or_else(|e| {
        panic!(
            "\n\nCATALOG BUILD ERROR: Failed to read file\n\
             Path: {}\n\
             Error: {e}\n",
            catalog_path.display()
        );
    });

    let catalog: serde_json::Value = serde_json::from_str(&catalog_contents).unwrap_or_else(|e| {
        panic!(
            "\n\nCATALOG BUILD ERROR: Invalid JSON\n\
             Path: {}\n\
             Error: {e}\n\
             Hint: Check for missing commas, brackets, or invalid syntax.\n",
            catalog_path.display()
        );
    });

    let entries = catalog.as_array().unwrap_or_else(|| {
        panic!(
            "\n\nCATALOG BUILD ERROR: Root must be a JSON array of entries\n\
             Got: {catalog}\n"
        );
    });

    let (tools, folders) = validate_entries(entries, "");

    println!("cargo:warning=Validated default catalog: {tools} tools, {folders} folders");
}

/// Validate a list of entries, recursing into folders. Returns (tools, folders).
fn validate_entries(entries: &[serde_json::Value], parent: &str) -> (usize, usize) {
    let mut tools = 0;
    let mut folders = 0;

    for (i, entry) in entries.iter().enumerate() {
        let name = validate_name(entry, parent, i);
        let location = format!("{parent}/{name}");

        match entry.get("type").and_then(|v| v.as_str()).unwrap_or("tool") {
            "tool" => {
                validate_tool_fields(entry, &location);
                tools += 1;
            }
            "folder" => {
                let children = entry
                    .get("children")
                    .and_then(|c| c.as_array())
                    .map_or(&[][..], Vec::as_slice);
                let (t, f) = validate_entries(children, &location);
                tools += t;
                folders += f + 1;
            }
            other => panic!(
                "\n\nCATALOG BUILD ERROR: Entry '{location}' has unknown type '{other}'\n\
                 Expected \"tool\" or \"folder\".\n"
            ),
        }
    }

    (tools, folders)
}

fn validate_name<'a>(entry: &'a serde_json::Value, parent: &str, index: usize) -> &'a str {
    let name = entry.get("name").and_then(|v| v.as_str()).unwrap_or_else(|| {
        panic!("\n\nCATALOG BUILD ERROR: Entry at '{parent}' index {index} missing 'name' field\n");
    });
    assert!(
        !name.trim().is_empty(),
        "\n\nCATALOG BUILD ERROR: Entry at '{parent}' index {index} has an empty name\n"
    );
    name
}

fn validate_tool_fields(entry: &serde_json::Value, location: &str) {
    let url = entry.get("url").and_then(|v| v.as_str()).unwrap_or("");
    assert!(
        !url.trim().is_empty(),
        "\n\nCATALOG BUILD ERROR: Tool '{location}' missing 'url' field\n\
         Every tool needs a non-empty URL.\n"
    );
}

fn set_build_dependencies() {
    // Tell cargo to rerun if the bundled catalog changes
    println!("cargo:rerun-if-changed=catalogs/default_tools.json");

    // Tell cargo to rerun if build.rs changes
    println!("cargo:rerun-if-changed=build.rs");
}
