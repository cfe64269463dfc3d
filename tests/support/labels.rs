use std::path::Path;

/// Write `lines` as one label file named `name` inside `dir`.
pub fn write_label_file(dir: &Path, name: &str, lines: &[&str]) {
    std::fs::create_dir_all(dir).expect("create label dir");
    let mut body = lines.join("\n");
    body.push('\n');
    std::fs::write(dir.join(name), body).expect("write label file");
}

/// A labels directory shaped like an engine batch run.
pub fn write_batch_fixture(dir: &Path) {
    write_label_file(
        dir,
        "plate_001.txt",
        &["0 0.5 0.5 0.2 0.1 0.9", "1 0.3 0.3 0.05 0.05 0.4"],
    );
    write_label_file(
        dir,
        "plate_002.txt",
        &["0 0.2 0.2 0.1 0.1 0.75", "abc not a number", "9 0.6 0.6 0.3 0.3"],
    );
    write_label_file(dir, "plate_003.txt", &["3 0.5 0.5 0.05 0.02 0.66"]);
}
