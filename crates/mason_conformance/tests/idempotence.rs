//! Repeated passes over an unchanged project write nothing.

use std::collections::BTreeMap;

use mason_common::LogLevel;
use mason_conformance::{options_for, run_pass, Fixture};
use mason_generate::PassOptions;

#[test]
fn second_cmake_pass_writes_zero_files() {
    let fixture = Fixture::sample();
    let project = fixture.load();

    let (first, _) = run_pass(&project, &options_for("cmake"));
    let first = first.unwrap();
    assert_eq!(first.written.len(), 4);
    assert!(first.kept.is_empty());

    let (second, logger) = run_pass(&project, &options_for("cmake"));
    let second = second.unwrap();
    assert!(second.written.is_empty(), "wrote {:?}", second.written);
    assert_eq!(second.kept.len(), 4);
    assert!(!logger.contains(LogLevel::Info, "Writing"));
}

#[test]
fn second_pass_sees_no_changed_inputs() {
    let fixture = Fixture::sample();
    let project = fixture.load();

    let (first, _) = run_pass(&project, &options_for("dummy"));
    assert_eq!(first.unwrap().changed_inputs.len(), project.files().len());

    let (second, _) = run_pass(&project, &options_for("dummy"));
    assert!(second.unwrap().changed_inputs.is_empty());
}

#[test]
fn generated_files_keep_their_mtime_on_unchanged_pass() {
    let fixture = Fixture::sample();
    let project = fixture.load();
    run_pass(&project, &options_for("cmake")).0.unwrap();

    let root_lists = project.build_directory().join("cmake").join("CMakeLists.txt");
    let before = std::fs::metadata(&root_lists).unwrap().modified().unwrap();
    std::thread::sleep(std::time::Duration::from_millis(20));

    run_pass(&project, &options_for("cmake")).0.unwrap();
    let after = std::fs::metadata(&root_lists).unwrap().modified().unwrap();
    assert_eq!(before, after);
}

#[test]
fn changing_a_selection_rewrites_only_affected_files() {
    let fixture = Fixture::sample();
    let project = fixture.load();
    run_pass(&project, &options_for("cmake")).0.unwrap();

    let options = PassOptions {
        generator: Some("cmake".to_string()),
        overrides: BTreeMap::from([("mode".to_string(), "release".to_string())]),
        ..PassOptions::default()
    };
    let (report, _) = run_pass(&project, &options);
    let report = report.unwrap();
    assert_eq!(report.written.len(), 1);
    assert!(report.written[0].ends_with("src/CMakeLists.txt"));
    assert!(fixture
        .read(".build/cmake/src/CMakeLists.txt")
        .contains("-DNDEBUG"));
}

#[test]
fn remembered_selection_keeps_following_passes_idle() {
    let fixture = Fixture::sample();
    let project = fixture.load();

    let options = PassOptions {
        generator: Some("cmake".to_string()),
        overrides: BTreeMap::from([("mode".to_string(), "release".to_string())]),
        ..PassOptions::default()
    };
    run_pass(&project, &options).0.unwrap();

    // No generator and no override: both come back from the cache.
    let (report, _) = run_pass(&project, &PassOptions::default());
    let report = report.unwrap();
    assert_eq!(report.generator, "cmake");
    assert_eq!(report.selections.get("mode"), Some("release"));
    assert!(report.written.is_empty());
}

#[test]
fn editing_a_project_file_is_reported_as_changed_input() {
    let fixture = Fixture::sample();
    let project = fixture.load();
    run_pass(&project, &options_for("dummy")).0.unwrap();

    std::thread::sleep(std::time::Duration::from_millis(20));
    fixture.write(
        "lib/project.toml",
        "source_files = [\"lib.cpp\"]\nheader_search_paths = [\".\"]\ndefine = [\"LIB\"]\n",
    );
    let project = fixture.load();
    let (report, _) = run_pass(&project, &options_for("dummy"));
    let changed = report.unwrap().changed_inputs;
    assert_eq!(changed.len(), 1);
    assert!(
        changed[0].ends_with("lib/project.toml"),
        "unexpected change set {changed:?}"
    );
}

#[test]
fn build_directory_is_not_scanned_as_sources() {
    let fixture = Fixture::with_project("target_name = \"flat\"\nsource_directories = [\".\"]\n");
    fixture.write("main.cpp", "int main() { return 0; }\n");
    let project = fixture.load();
    run_pass(&project, &options_for("cmake")).0.unwrap();

    // What a configure run of the build tool leaves behind.
    fixture.write(
        ".build/cmake/build/CMakeFiles/3.28.3/CompilerIdCXX/CMakeCXXCompilerId.cpp",
        "int main() {}\n",
    );

    let (second, _) = run_pass(&project, &options_for("cmake"));
    let second = second.unwrap();
    assert!(second.written.is_empty(), "wrote {:?}", second.written);
    let lists = fixture.read(".build/cmake/src/SourceFiles.cmake");
    assert!(lists.contains("main.cpp"));
    assert!(!lists.contains("CMakeCXXCompilerId"));

    let resolution = mason_conformance::resolve(&project, "cmake", "linux", &[]).unwrap();
    assert_eq!(resolution.model.source_files, [project.directory().join("main.cpp")]);
}
