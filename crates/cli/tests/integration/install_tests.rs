use predicates::prelude::*;

use crate::common::TestEnv;

/// A recipe for `hello` whose steps are the given `/bin/sh -c` scripts.
fn shell_recipe(url: &str, sha256: &str, scripts: &[&str]) -> String {
  let mut text = format!(
    r#"
id = "hello"
description = "test package"
homepage = "https://example.com/hello"
url = "{url}"
sha256 = "{sha256}"
version = "1.0"
"#
  );
  for script in scripts {
    text.push_str(&format!(
      "\n[[install]]\nprogram = \"/bin/sh\"\nargs = [\"-c\", '{script}']\n"
    ));
  }
  text
}

fn hello_archive(env: &TestEnv) -> (String, String) {
  env.source_archive("hello-1.0", &[("greeting.txt", "hello, world\n")])
}

#[test]
fn install_copies_into_cellar_and_links_opt() {
  let env = TestEnv::new();
  let (url, sha256) = hello_archive(&env);
  let recipe = env.write_recipe(&shell_recipe(
    &url,
    &sha256,
    &[
      "mkdir -p $${prefix}/share",
      "cp greeting.txt $${prefix}/share/greeting.txt",
    ],
  ));

  env
    .kiln_cmd()
    .arg("install")
    .arg(&recipe)
    .assert()
    .success()
    .stdout(predicate::str::contains("Installed hello"));

  let prefix = env.root_path().join("cellar/hello/1.0");
  let installed = std::fs::read_to_string(prefix.join("share/greeting.txt")).unwrap();
  assert_eq!(installed, "hello, world\n");

  let link = env.root_path().join("opt/hello");
  assert_eq!(std::fs::read_link(&link).unwrap(), prefix);

  assert!(!env.cache_path().join("work/hello").exists());
  assert!(env.cache_path().join("downloads/hello-1.0.tar.gz").is_file());
}

#[test]
fn install_respects_explicit_prefix_and_keep_work_dir() {
  let env = TestEnv::new();
  let (url, sha256) = hello_archive(&env);
  let recipe = env.write_recipe(&shell_recipe(&url, &sha256, &["cp greeting.txt $${prefix}/"]));
  let prefix = env.temp.path().join("custom-prefix");

  env
    .kiln_cmd()
    .arg("install")
    .arg(&recipe)
    .arg("--prefix")
    .arg(&prefix)
    .arg("--keep-work-dir")
    .assert()
    .success();

  assert!(prefix.join("greeting.txt").is_file());
  assert!(env.cache_path().join("work/hello/greeting.txt").is_file());
}

#[test]
fn failing_step_exit_code_is_propagated() {
  let env = TestEnv::new();
  let (url, sha256) = hello_archive(&env);
  let marker = env.temp.path().join("third-step-ran");
  let third = format!("touch {}", marker.display());
  let recipe = env.write_recipe(&shell_recipe(&url, &sha256, &["true", "exit 7", &third]));

  env
    .kiln_cmd()
    .arg("install")
    .arg(&recipe)
    .assert()
    .code(7)
    .stderr(predicate::str::contains("step 2"));

  assert!(!marker.exists());
  assert!(!env.root_path().join("opt/hello").exists());
}

#[test]
fn checksum_mismatch_runs_no_steps() {
  let env = TestEnv::new();
  let (url, _) = hello_archive(&env);
  let marker = env.temp.path().join("step-ran");
  let step = format!("touch {}", marker.display());
  let recipe = env.write_recipe(&shell_recipe(&url, &"0".repeat(64), &[&step]));

  env
    .kiln_cmd()
    .arg("install")
    .arg(&recipe)
    .assert()
    .code(125)
    .stderr(predicate::str::contains("checksum mismatch"));

  assert!(!marker.exists());
  assert!(!env.cache_path().join("downloads/hello-1.0.tar.gz").exists());
}

#[test]
fn missing_program_exits_127() {
  let env = TestEnv::new();
  let (url, sha256) = hello_archive(&env);
  let recipe = env.write_recipe(&format!(
    r#"
id = "hello"
description = "test package"
homepage = "https://example.com/hello"
url = "{url}"
sha256 = "{sha256}"

[[install]]
program = "./configure"
"#
  ));

  env.kiln_cmd().arg("install").arg(&recipe).assert().code(127);
}

#[test]
fn unresolved_dependency_fails_before_fetch() {
  let env = TestEnv::new();
  let (url, sha256) = hello_archive(&env);
  let mut text = shell_recipe(&url, &sha256, &["true"]);
  text = text.replace("version = \"1.0\"", "version = \"1.0\"\ndepends_on = [\"zlib\"]");
  let recipe = env.write_recipe(&text);

  env
    .kiln_cmd()
    .arg("install")
    .arg(&recipe)
    .assert()
    .code(125)
    .stderr(predicate::str::contains("unresolved dependency 'zlib'"));

  assert!(!env.cache_path().join("downloads").exists());
}

#[test]
fn relative_prefix_and_cache_are_anchored_at_cwd() {
  let env = TestEnv::new();
  let configure = "#!/bin/sh\nprefix=\"${1#--prefix=}\"\nmkdir -p \"$prefix/share\" && cp greeting.txt \"$prefix/share/\"\n";
  let (url, sha256) = env.source_archive(
    "hello-1.0",
    &[("greeting.txt", "hello, world\n"), ("configure", configure)],
  );
  let recipe = env.write_recipe(&format!(
    r#"
id = "hello"
description = "test package"
homepage = "https://example.com/hello"
url = "{url}"
sha256 = "{sha256}"

[[install]]
program = "./configure"
args = ["--prefix=$${{prefix}}"]
"#
  ));
  let cwd = dunce::canonicalize(env.temp.path()).unwrap();

  env
    .kiln_cmd()
    .current_dir(&cwd)
    .env("KILN_CACHE", "relcache")
    .arg("install")
    .arg(&recipe)
    .args(["--prefix", "rel-prefix"])
    .assert()
    .success();

  let prefix = cwd.join("rel-prefix");
  assert_eq!(
    std::fs::read_to_string(prefix.join("share/greeting.txt")).unwrap(),
    "hello, world\n"
  );

  let link = env.root_path().join("opt/hello");
  assert_eq!(std::fs::read_link(&link).unwrap(), prefix);
  assert!(link.join("share/greeting.txt").is_file());
  assert!(cwd.join("relcache/downloads/hello-1.0.tar.gz").is_file());
}
