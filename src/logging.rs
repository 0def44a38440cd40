//! Process-wide `tracing` subscriber setup.
//!
//! Events always go to stderr. Stdout and a size-rotated log file can be
//! added as extra outputs; all outputs share one format and one filter.

use std::io;
use std::str::FromStr;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use file_rotate::compression::Compression;
use file_rotate::suffix::{AppendTimestamp, FileLimit};
use file_rotate::{ContentLimit, FileRotate};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::MonitorError;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

const BYTES_PER_MB: u64 = 1024 * 1024;
const DEFAULT_MAX_SIZE_MB: u64 = 100;

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = MonitorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(MonitorError::Configuration {
                message: format!("log format must be 'text' or 'json', got '{other}'"),
            }),
        }
    }
}

/// Rotation policy for the log file.
///
/// A zero value disables the corresponding limit. When both `max_backups`
/// and `max_age_days` are set, the backup count wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRotation {
    /// Rotate once the file grows past this many megabytes.
    pub max_size_mb: u64,
    /// Rotated files to keep.
    pub max_backups: usize,
    /// Days to keep rotated files.
    pub max_age_days: u64,
    /// Gzip rotated files.
    pub compress: bool,
}

impl Default for LogRotation {
    fn default() -> Self {
        Self {
            max_size_mb: DEFAULT_MAX_SIZE_MB,
            max_backups: 0,
            max_age_days: 0,
            compress: false,
        }
    }
}

impl LogRotation {
    /// When the active file is rotated.
    #[must_use]
    pub fn content_limit(self) -> ContentLimit {
        if self.max_size_mb == 0 {
            return ContentLimit::None;
        }
        let bytes = self
            .max_size_mb
            .checked_mul(BYTES_PER_MB)
            .and_then(|bytes| usize::try_from(bytes).ok())
            .unwrap_or(usize::MAX);
        ContentLimit::BytesSurpassed(bytes)
    }

    /// Which rotated files are pruned.
    #[must_use]
    pub fn file_limit(self) -> FileLimit {
        if self.max_backups > 0 {
            return FileLimit::MaxFiles(self.max_backups);
        }
        i64::try_from(self.max_age_days)
            .ok()
            .filter(|days| *days > 0)
            .and_then(chrono::Duration::try_days)
            .map_or(FileLimit::Unlimited, FileLimit::Age)
    }

    /// Compression applied to rotated files.
    #[must_use]
    pub const fn compression(self) -> Compression {
        if self.compress {
            Compression::OnRotate(0)
        } else {
            Compression::None
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    /// Level or `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Line format.
    pub format: LogFormat,
    /// Also write to stdout.
    pub stdout: bool,
    /// Also append to this file.
    pub file: Option<Utf8PathBuf>,
    /// Rotation policy for `file`.
    pub rotation: LogRotation,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Text,
            stdout: false,
            file: None,
            rotation: LogRotation::default(),
        }
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`MonitorError::Logging`] when the filter directive is invalid, the
/// log file cannot be opened, or a global subscriber is already installed.
pub fn init(options: &LoggingOptions) -> Result<(), MonitorError> {
    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), &options.level)?;

    let mut layers: Vec<BoxedLayer> = vec![output_layer(options.format, io::stderr, true)];
    if options.stdout {
        layers.push(output_layer(options.format, io::stdout, true));
    }
    if let Some(path) = &options.file {
        let file = open_log_file(path, options.rotation)?;
        layers.push(output_layer(options.format, Mutex::new(file), false));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|error| MonitorError::Logging {
            message: error.to_string(),
        })
}

/// Builds the filter from `RUST_LOG` when set, else from `level`.
///
/// # Errors
///
/// Returns [`MonitorError::Logging`] when the chosen directive is invalid.
pub fn build_filter(rust_log: Option<&str>, level: &str) -> Result<EnvFilter, MonitorError> {
    let directive = rust_log
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(level);
    EnvFilter::try_new(directive).map_err(|error| MonitorError::Logging {
        message: format!("invalid log filter '{directive}': {error}"),
    })
}

fn output_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .boxed(),
    }
}

fn open_log_file(
    path: &Utf8Path,
    rotation: LogRotation,
) -> Result<FileRotate<AppendTimestamp>, MonitorError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| MonitorError::Logging {
        message: format!("log file path '{path}' has no file name"),
    })?;

    let io_error = |error: io::Error| MonitorError::Logging {
        message: format!("failed to open log file '{path}': {error}"),
    };
    let (base, relative) = match parent.strip_prefix("/") {
        Ok(relative) => ("/", relative),
        Err(_) => (".", parent),
    };
    if !relative.as_str().is_empty() && relative != Utf8Path::new(".") {
        Dir::open_ambient_dir(base, ambient_authority())
            .and_then(|root| root.create_dir_all(relative))
            .map_err(io_error)?;
    }

    Ok(FileRotate::new(
        parent.join(file_name),
        AppendTimestamp::default(rotation.file_limit()),
        rotation.content_limit(),
        rotation.compression(),
        #[cfg(unix)]
        None,
    ))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use camino::Utf8PathBuf;
    use file_rotate::ContentLimit;
    use file_rotate::compression::Compression;
    use file_rotate::suffix::FileLimit;
    use rstest::rstest;

    use super::{LogFormat, LogRotation, build_filter, open_log_file};
    use crate::error::MonitorError;

    #[rstest]
    #[case("text", LogFormat::Text)]
    #[case("JSON", LogFormat::Json)]
    #[case(" json ", LogFormat::Json)]
    fn parses_log_format(#[case] input: &str, #[case] expected: LogFormat) {
        assert_eq!(input.parse::<LogFormat>(), Ok(expected));
    }

    #[rstest]
    fn rejects_unknown_log_format() {
        let result = "yaml".parse::<LogFormat>();

        assert!(matches!(result, Err(MonitorError::Configuration { .. })));
    }

    #[rstest]
    #[case(None, "info", "info")]
    #[case(Some("stalewatch=debug"), "info", "stalewatch=debug")]
    #[case(Some("  "), "warn", "warn")]
    fn rust_log_overrides_level(
        #[case] rust_log: Option<&str>,
        #[case] level: &str,
        #[case] expected: &str,
    ) {
        let filter = build_filter(rust_log, level).expect("filter should build");

        assert_eq!(filter.to_string(), expected);
    }

    #[rstest]
    fn rejects_invalid_directive() {
        let result = build_filter(None, "stalewatch=loud");

        assert!(matches!(result, Err(MonitorError::Logging { .. })));
    }

    #[rstest]
    fn log_file_is_created_with_parents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("logs/stalewatch.log"))
            .expect("UTF-8 path");

        let mut writer =
            open_log_file(&path, LogRotation::default()).expect("log file should open");
        writer.write_all(b"started\n").expect("write");
        writer.flush().expect("flush");

        assert!(path.exists());
    }

    #[rstest]
    fn log_file_rotates_past_the_size_limit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("stalewatch.log"))
            .expect("UTF-8 path");
        let rotation = LogRotation {
            max_size_mb: 1,
            ..LogRotation::default()
        };
        let line = [b'x'; 1024];

        let mut writer = open_log_file(&path, rotation).expect("log file should open");
        for _ in 0..1536 {
            writer.write_all(&line).expect("write");
        }
        writer.flush().expect("flush");

        let rotated = std::fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(Result::ok)
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("stalewatch.log.")
            })
            .count();
        assert_eq!(rotated, 1);
        assert!(path.exists());
    }

    #[rstest]
    fn default_rotation_caps_size_and_keeps_everything() {
        let rotation = LogRotation::default();

        assert!(matches!(
            rotation.content_limit(),
            ContentLimit::BytesSurpassed(bytes) if bytes == 100 * 1024 * 1024
        ));
        assert!(matches!(rotation.file_limit(), FileLimit::Unlimited));
        assert!(matches!(rotation.compression(), Compression::None));
    }

    #[rstest]
    #[case::backups_only(5, 0, Some(5), None)]
    #[case::age_only(0, 30, None, Some(30))]
    #[case::backups_win(5, 30, Some(5), None)]
    fn file_limit_follows_backups_then_age(
        #[case] max_backups: usize,
        #[case] max_age_days: u64,
        #[case] expected_files: Option<usize>,
        #[case] expected_days: Option<i64>,
    ) {
        let rotation = LogRotation {
            max_backups,
            max_age_days,
            ..LogRotation::default()
        };

        match rotation.file_limit() {
            FileLimit::MaxFiles(files) => assert_eq!(Some(files), expected_files),
            FileLimit::Age(age) => assert_eq!(Some(age.num_days()), expected_days),
            FileLimit::Unlimited => panic!("expected a limit"),
        }
    }

    #[rstest]
    fn disabled_limits_and_compression() {
        let rotation = LogRotation {
            max_size_mb: 0,
            compress: true,
            ..LogRotation::default()
        };

        assert!(matches!(rotation.content_limit(), ContentLimit::None));
        assert!(matches!(rotation.compression(), Compression::OnRotate(0)));
    }
}
