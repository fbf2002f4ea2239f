// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use camino::Utf8Path;
use runner_host_bootstrap::Config;

#[test]
fn test_sample_config_parses() {
    let config = Config::from_file(Utf8Path::new("configs/config.toml"))
        .expect("sample config should parse");
    assert_eq!(config.cluster.name, "ci-runners");
    assert_eq!(config.storage.device, "/dev/xvdb");
    assert!(config.cleanup.enabled);
    assert_eq!(config.cleanup.schedule, "0 3 * * *");
}
