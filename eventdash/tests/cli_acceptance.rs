use eventdash_core::{Database, Table};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const EVENT: &str = "expo-2025";

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
    work: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");
        let work = base.join("work");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_data).expect("failed to create XDG_DATA_HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");
        fs::create_dir_all(&work).expect("failed to create work dir");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
            work,
        }
    }

    fn db_path(&self) -> PathBuf {
        self.xdg_data.join("eventdash/data.db")
    }

    fn write_config(&self, contents: &str) {
        let dir = self.xdg_config.join("eventdash");
        fs::create_dir_all(&dir).expect("failed to create config dir");
        fs::write(dir.join("config.toml"), contents).expect("failed to write config");
    }
}

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../eventdash-core/tests/fixtures/expo.json")
}

fn run_bin(env: &CliTestEnv, bin_name: &str, args: &[&str]) -> Output {
    let bin_path = match bin_name {
        "eventdash-report" => PathBuf::from(assert_cmd::cargo::cargo_bin!("eventdash-report")),
        "eventdash-export" => PathBuf::from(assert_cmd::cargo::cargo_bin!("eventdash-export")),
        "eventdash-admin" => PathBuf::from(assert_cmd::cargo::cargo_bin!("eventdash-admin")),
        _ => panic!("unsupported binary in test harness: {bin_name}"),
    };

    let mut command = Command::new(bin_path);

    command
        .args(args)
        .current_dir(&env.work)
        .env("HOME", &env.home)
        .env("XDG_DATA_HOME", &env.xdg_data)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env_remove("EVENTDASH_API_KEY")
        .output()
        .unwrap_or_else(|e| panic!("failed to execute {bin_name}: {e}"))
}

fn assert_success(bin_name: &str, args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "{bin_name} {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

fn import_fixture(env: &CliTestEnv) {
    let fixture = fixture_path();
    let fixture = fixture.to_str().expect("fixture path is not UTF-8");
    let args = ["import", fixture];
    let output = run_bin(env, "eventdash-admin", &args);
    assert_success("eventdash-admin", &args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Imported 18 rows"),
        "expected import summary in stdout, got:\n{stdout}"
    );
}

fn csv_files(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .expect("export dir should exist")
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
        .collect()
}

#[test]
fn import_populates_local_store() {
    let env = CliTestEnv::new();
    import_fixture(&env);

    let db_path = env.db_path();
    assert!(
        db_path.exists(),
        "database file should exist at {}",
        db_path.display()
    );

    let db = Database::open(&db_path).expect("failed to open db");
    db.migrate().expect("failed to migrate db");
    assert_eq!(db.count_rows(Table::Attendees, EVENT).unwrap(), 3);
    assert_eq!(db.count_rows(Table::Feedback, EVENT).unwrap(), 3);

    let log_files: Vec<String> = fs::read_dir(env.xdg_state.join("eventdash"))
        .expect("log dir should exist")
        .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    assert!(
        log_files
            .iter()
            .any(|name| name.starts_with(eventdash_core::logging::LOG_FILE_PREFIX)),
        "expected a rolling log file, got {log_files:?}"
    );
}

#[test]
fn report_prints_text_and_json() {
    let env = CliTestEnv::new();
    import_fixture(&env);

    let text_args = [EVENT, "--tab", "reporting"];
    let text = run_bin(&env, "eventdash-report", &text_args);
    assert_success("eventdash-report", &text_args, &text);
    let stdout = String::from_utf8_lossy(&text.stdout);
    assert!(stdout.contains("Builders Expo (reporting)"));
    assert!(stdout.contains("Revenue:         1.0K"));
    assert!(stdout.contains("Unknown attendee"));

    let json_args = [EVENT, "--tab", "reporting", "--format", "json"];
    let json = run_bin(&env, "eventdash-report", &json_args);
    assert_success("eventdash-report", &json_args, &json);
    let report: serde_json::Value =
        serde_json::from_slice(&json.stdout).expect("report should print JSON");
    assert_eq!(report["tab"], "reporting");
    assert_eq!(report["stats"]["revenue"], 1000.0);
    assert_eq!(report["stats"]["sell_through"], 60);
    assert_eq!(report["stats"]["nps"], 33);
    assert_eq!(report["registrations"].as_array().map(Vec::len), Some(3));
}

#[test]
fn report_writes_svg_chart() {
    let env = CliTestEnv::new();
    import_fixture(&env);

    let svg_path = env.work.join("registrations.svg");
    let svg = svg_path.to_str().unwrap();
    let args = [EVENT, "--svg", svg];
    let output = run_bin(&env, "eventdash-report", &args);
    assert_success("eventdash-report", &args, &output);

    let contents = fs::read_to_string(&svg_path).expect("svg should be written");
    assert!(contents.starts_with("<svg"));
    assert!(contents.contains("Mar 2"));
}

#[test]
fn report_rejects_unknown_format() {
    let env = CliTestEnv::new();
    import_fixture(&env);

    let output = run_bin(&env, "eventdash-report", &[EVENT, "--format", "jsno"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid value 'jsno'"), "stderr was:\n{stderr}");
}

#[test]
fn report_unknown_event_fails() {
    let env = CliTestEnv::new();
    import_fixture(&env);

    let output = run_bin(&env, "eventdash-report", &["no-such-event"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No event found"), "stderr was:\n{stderr}");
}

#[test]
fn export_writes_csv_to_configured_dir() {
    let env = CliTestEnv::new();
    let export_dir = env.work.join("exports");
    env.write_config(&format!(
        "[export]\ndir = \"{}\"\n",
        export_dir.display()
    ));
    import_fixture(&env);

    let args = [EVENT, "attendees"];
    let output = run_bin(&env, "eventdash-export", &args);
    assert_success("eventdash-export", &args, &output);

    let files = csv_files(&export_dir);
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("event-expo-2025-attendees-"), "got {name}");

    let contents = fs::read_to_string(&files[0]).unwrap();
    assert_eq!(contents.lines().count(), 4);
    assert!(contents.contains("bob@example.com"));

    let stdout_args = [EVENT, "tickets", "--stdout"];
    let stdout = run_bin(&env, "eventdash-export", &stdout_args);
    assert_success("eventdash-export", &stdout_args, &stdout);
    assert!(String::from_utf8_lossy(&stdout.stdout).contains("\"VIP, all access\""));

    let bad = run_bin(&env, "eventdash-export", &[EVENT, "payments"]);
    assert!(!bad.status.success());
}

#[test]
fn admin_publish_and_ticket_writes() {
    let env = CliTestEnv::new();
    import_fixture(&env);

    let publish_args = ["publish", EVENT];
    let publish = run_bin(&env, "eventdash-admin", &publish_args);
    assert_success("eventdash-admin", &publish_args, &publish);

    let missing = run_bin(&env, "eventdash-admin", &["publish", "no-such-event"]);
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("failed to publish event"));

    let save_args = [
        "ticket-save",
        EVENT,
        "--name",
        "Student",
        "--price",
        "10",
        "--quantity",
        "50",
    ];
    let save = run_bin(&env, "eventdash-admin", &save_args);
    assert_success("eventdash-admin", &save_args, &save);

    let delete_args = ["ticket-delete", EVENT, "t-std"];
    let delete = run_bin(&env, "eventdash-admin", &delete_args);
    assert_success("eventdash-admin", &delete_args, &delete);

    let again = run_bin(&env, "eventdash-admin", &delete_args);
    assert!(!again.status.success());

    let json_args = [EVENT, "--tab", "overview", "--format", "json"];
    let overview = run_bin(&env, "eventdash-report", &json_args);
    assert_success("eventdash-report", &json_args, &overview);
    let overview: serde_json::Value = serde_json::from_slice(&overview.stdout).unwrap();
    assert_eq!(overview["event"]["status"], "published");
    // VIP (5 sold at 100) remains; Student has no sales yet
    assert_eq!(overview["stats"]["revenue"], 500.0);
    assert_eq!(overview["stats"]["tickets_available"], 55);
    let actions: Vec<&str> = overview["recent_activity"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|a| a["action"].as_str())
        .collect();
    assert!(actions.contains(&"ticket_created"));
    assert!(actions.contains(&"ticket_deleted"));
}
