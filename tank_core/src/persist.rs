//! Optional on-disk persistence of remotely overridden calibration.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use eyre::WrapErr;
use tank_config::PersistedCalibration;

use crate::error::Result;
use crate::level::Calibration;

/// Replace `path` with `bytes` via a synced sibling temp file and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir)?;
    }
    let tmp = temp_path(path)?;
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)
}

/// Sibling of `path` named `<file name>.tmp`, distinct from `path` for any extension.
fn temp_path(path: &Path) -> std::io::Result<PathBuf> {
    let mut name = path
        .file_name()
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} has no file name", path.display()),
            )
        })?
        .to_os_string();
    name.push(".tmp");
    Ok(path.with_file_name(name))
}

/// Calibration to start with: the persisted override when present, else the configured one.
pub fn load_calibration(cfg: &tank_config::CalibrationCfg) -> Result<Calibration> {
    if let Some(file) = cfg.persist_file.as_deref() {
        let path = Path::new(file);
        if let Some(p) = PersistedCalibration::load(path)? {
            tracing::info!(
                path = %path.display(),
                empty_level = p.empty_level,
                full_level = p.full_level,
                "using persisted calibration"
            );
            return Calibration::try_from(p).map_err(eyre::Report::new);
        }
    }
    Calibration::try_from(cfg).map_err(eyre::Report::new)
}

pub fn save_calibration(path: &Path, cal: &Calibration) -> Result<()> {
    let body = PersistedCalibration::from(*cal).to_toml()?;
    write_atomic(path, body.as_bytes())
        .wrap_err_with(|| format!("persist calibration to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_override_wins_over_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("cal.toml");
        let cfg = tank_config::CalibrationCfg {
            persist_file: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        };
        assert_eq!(load_calibration(&cfg).unwrap(), Calibration::default());

        let cal = Calibration::new(100, 12).unwrap();
        save_calibration(&path, &cal).unwrap();
        assert!(!dir.path().join("state").join("cal.toml.tmp").exists());
        assert_eq!(load_calibration(&cfg).unwrap(), cal);
    }

    #[test]
    fn target_already_ending_in_tmp_is_written_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cal.tmp");
        assert_eq!(temp_path(&path).unwrap(), dir.path().join("cal.tmp.tmp"));

        let cal = Calibration::new(64, 9).unwrap();
        save_calibration(&path, &cal).unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("cal.tmp")]);

        let cfg = tank_config::CalibrationCfg {
            persist_file: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        };
        assert_eq!(load_calibration(&cfg).unwrap(), cal);
    }

    #[test]
    fn corrupt_persisted_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cal.toml");
        fs::write(&path, "empty_level = \"x\"").unwrap();
        let cfg = tank_config::CalibrationCfg {
            persist_file: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        };
        assert!(load_calibration(&cfg).is_err());
    }
}
