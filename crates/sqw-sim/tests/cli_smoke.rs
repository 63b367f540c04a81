use std::fs;

use sqw_corr::CorrelationSnapshot;
use sqw_sim::{run, write_queries, RunConfig};
use tempfile::tempdir;

const CONFIG: &str = r#"
lattice:
  latsize: [4, 1, 1]
  bonds:
    - { i: 0, j: 0, offset: [1, 0, 0], coupling: -1.0 }
  field: [0.0, 0.0, 0.3]
dynamics:
  dt: 0.05
  thermalize: 2
  langevin: { dt: 0.02, damping: 0.2, kt: 0.3, steps_per_sample: 10 }
correlations:
  num_omegas: 5
samples: 3
workers: 2
seed_policy:
  master_seed: 99
queries:
  - name: points
    kind:
      points:
        qs: [[0.0, 0.0, 0.0], [0.25, 0.0, 0.0]]
  - name: full_static
    mode: full
    kind:
      static:
        qs: [[0.5, 0.0, 0.0]]
  - name: path
    mode: perp
    opts: { interpolation: linear, kt: 0.3, correction: detailed-balance }
    kind:
      path:
        waypoints: [[0.0, 0.0, 0.0], [0.5, 0.0, 0.0]]
        density: 4.0
  - name: powder
    kind:
      powder: { radii: [0.0, 1.0], density: 2.0 }
"#;

fn config() -> RunConfig {
    serde_yaml::from_str(CONFIG).expect("config")
}

#[test]
fn run_writes_snapshot_summary_and_queries() {
    let dir = tempdir().expect("tempdir");
    let summary = run(&config(), dir.path()).expect("run");
    assert_eq!(summary.nsamples, 3);
    assert_eq!(summary.omegas.len(), 5);
    assert_eq!(summary.queries.len(), 4);
    for file in ["correlations.bin", "summary.json", "points.json", "full_static.json", "path.json", "powder.json"] {
        assert!(dir.path().join(file).exists(), "{file} missing");
    }
    let points: serde_json::Value =
        serde_json::from_slice(&fs::read(dir.path().join("points.json")).expect("read")).expect("json");
    assert_eq!(points["omegas"].as_array().map(Vec::len), Some(5));
}

#[test]
fn runs_are_reproducible_from_the_master_seed() {
    let first = tempdir().expect("tempdir");
    let second = tempdir().expect("tempdir");
    let a = run(&config(), first.path()).expect("run");
    let b = run(&config(), second.path()).expect("run");
    assert_eq!(a.content_hash, b.content_hash);
    assert_eq!(
        fs::read(first.path().join("path.json")).expect("read"),
        fs::read(second.path().join("path.json")).expect("read")
    );
}

#[test]
fn queries_can_be_replayed_from_snapshot() {
    let dir = tempdir().expect("tempdir");
    let cfg = config();
    run(&cfg, dir.path()).expect("run");
    let bytes = fs::read(dir.path().join("correlations.bin")).expect("read");
    let restored = CorrelationSnapshot::from_bytes(&bytes)
        .expect("decode")
        .restore()
        .expect("restore");
    let replay = tempdir().expect("tempdir");
    let written = write_queries(&restored, &cfg.queries, replay.path()).expect("replay");
    assert_eq!(written.len(), cfg.queries.len());
    let original: serde_json::Value =
        serde_json::from_slice(&fs::read(dir.path().join("powder.json")).expect("read")).expect("json");
    let replayed: serde_json::Value =
        serde_json::from_slice(&fs::read(replay.path().join("powder.json")).expect("read")).expect("json");
    assert_eq!(original["radii"], replayed["radii"]);
    assert_eq!(
        original["omegas"].as_array().map(Vec::len),
        replayed["omegas"].as_array().map(Vec::len)
    );
}

#[test]
fn invalid_mode_is_reported_at_parse_time() {
    let broken = CONFIG.replace("mode: full", "mode: diagonal");
    assert!(serde_yaml::from_str::<RunConfig>(&broken).is_err());
}
