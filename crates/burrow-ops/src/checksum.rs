//! Streaming multi-algorithm checksums.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::Digest as _;
use strum::{Display, EnumString};

use burrow_core::{
    EngineConfig, EngineError, EngineResult, Operation, ProgressData, ProgressReporter,
    ProgressSink,
};

/// Bytes read per chunk.
const CHUNK_SIZE: usize = 64 * 1024;

/// Supported digest algorithms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ChecksumAlgorithm {
    Md5,
    Sha256,
    Blake3,
}

impl ChecksumAlgorithm {
    /// Display label used in progress events.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha256 => "SHA-256",
            Self::Blake3 => "BLAKE3",
        }
    }
}

/// Parse requested algorithm names. Duplicates collapse; order is kept.
///
/// An empty list or an unsupported name is rejected.
pub fn parse_algorithms<S: AsRef<str>>(names: &[S]) -> EngineResult<Vec<ChecksumAlgorithm>> {
    if names.is_empty() {
        return Err(EngineError::invalid("no checksum algorithms requested"));
    }

    let mut algorithms = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref().trim();
        let algorithm: ChecksumAlgorithm = name.parse().map_err(|_| {
            EngineError::invalid(format!("unsupported checksum algorithm '{name}'"))
        })?;
        if !algorithms.contains(&algorithm) {
            algorithms.push(algorithm);
        }
    }
    Ok(algorithms)
}

enum Accumulator {
    Md5(md5::Context),
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Accumulator {
    fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            ChecksumAlgorithm::Md5 => Self::Md5(md5::Context::new()),
            ChecksumAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
            ChecksumAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(ctx) => ctx.consume(data),
            Self::Sha256(hasher) => hasher.update(data),
            Self::Blake3(hasher) => {
                hasher.update(data);
            }
        }
    }

    fn finish(self) -> String {
        match self {
            Self::Md5(ctx) => format!("{:x}", ctx.compute()),
            Self::Sha256(hasher) => format!("{:x}", hasher.finalize()),
            Self::Blake3(hasher) => hasher.finalize().to_hex().to_string(),
        }
    }
}

/// Hash `path` once with every requested algorithm.
///
/// Returns algorithm name to lowercase hex digest, in request order.
/// Cancellation is checked before every chunk; a cancelled run yields no
/// digests at all.
pub fn checksum(
    path: &Path,
    algorithms: &[ChecksumAlgorithm],
    config: &EngineConfig,
    op: &Operation,
    progress: &dyn ProgressSink,
) -> EngineResult<IndexMap<String, String>> {
    if algorithms.is_empty() {
        return Err(EngineError::invalid("no checksum algorithms requested"));
    }

    let mut file = File::open(path).map_err(|e| EngineError::io(path, e))?;
    let metadata = file.metadata().map_err(|e| EngineError::io(path, e))?;
    if metadata.is_dir() {
        return Err(EngineError::invalid(format!(
            "cannot checksum a directory: {}",
            path.display()
        )));
    }
    let total = metadata.len();

    let label = algorithms
        .iter()
        .map(|a| a.label())
        .collect::<Vec<_>>()
        .join(", ");
    let mut accumulators: Vec<(ChecksumAlgorithm, Accumulator)> = algorithms
        .iter()
        .map(|&a| (a, Accumulator::new(a)))
        .collect();
    let mut reporter = ProgressReporter::new(progress, config.progress_interval());

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut processed = 0u64;
    loop {
        op.check()?;
        let read = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(EngineError::io(path, e)),
        };
        for (_, acc) in accumulators.iter_mut() {
            acc.update(&buf[..read]);
        }
        processed += read as u64;

        reporter.report(|| ProgressData::Checksum {
            percent: percent(processed, total),
            algorithm: label.clone(),
        });
    }

    reporter.force(ProgressData::Checksum {
        percent: 100.0,
        algorithm: label.clone(),
    });
    tracing::debug!(path = %path.display(), bytes = processed, algorithms = %label, "checksum finished");
    Ok(accumulators
        .into_iter()
        .map(|(algorithm, acc)| (algorithm.to_string(), acc.finish()))
        .collect())
}

fn percent(processed: u64, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        (processed as f64 / total as f64 * 100.0).min(100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_core::NoProgress;

    #[test]
    fn test_parse_algorithms() {
        let parsed = parse_algorithms(&["SHA256", "md5", "sha256"]).unwrap();
        assert_eq!(parsed, vec![ChecksumAlgorithm::Sha256, ChecksumAlgorithm::Md5]);

        assert!(matches!(
            parse_algorithms::<&str>(&[]),
            Err(EngineError::InvalidInput { .. })
        ));
        assert!(matches!(
            parse_algorithms(&["crc32"]),
            Err(EngineError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_known_digests() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("abc.txt");
        std::fs::write(&path, "abc").unwrap();

        let digests = checksum(
            &path,
            &[ChecksumAlgorithm::Sha256, ChecksumAlgorithm::Md5],
            &EngineConfig::default(),
            &Operation::detached(),
            &NoProgress,
        )
        .unwrap();

        let keys: Vec<_> = digests.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["sha256", "md5"]);
        assert_eq!(digests["md5"], "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(
            digests["sha256"],
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_blake3_matches_one_shot() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("big.bin");
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let digests = checksum(
            &path,
            &[ChecksumAlgorithm::Blake3],
            &EngineConfig::default(),
            &Operation::detached(),
            &NoProgress,
        )
        .unwrap();
        assert_eq!(digests["blake3"], blake3::hash(&data).to_hex().to_string());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let temp = tempfile::TempDir::new().unwrap();
        let result = checksum(
            &temp.path().join("nope"),
            &[ChecksumAlgorithm::Md5],
            &EngineConfig::default(),
            &Operation::detached(),
            &NoProgress,
        );
        assert!(matches!(result, Err(EngineError::NotFound { .. })));
    }

    #[test]
    fn test_final_progress_is_complete() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("small.txt");
        std::fs::write(&path, "tiny").unwrap();

        let seen = std::sync::Mutex::new(Vec::new());
        let sink = |data: ProgressData| seen.lock().unwrap().push(data);
        let config = EngineConfig::builder()
            .progress_interval_ms(60_000u64)
            .build()
            .unwrap();
        checksum(
            &path,
            &[ChecksumAlgorithm::Md5, ChecksumAlgorithm::Blake3],
            &config,
            &Operation::detached(),
            &sink,
        )
        .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen.last(),
            Some(&ProgressData::Checksum {
                percent: 100.0,
                algorithm: "MD5, BLAKE3".into()
            })
        );
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 0), 100.0);
        assert_eq!(percent(50, 200), 25.0);
    }
}
