use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::archive::DEFAULT_ARCHIVER;
use crate::cli::RunArgs;
use crate::error::{BackupError, Result};
use crate::job::{BackupJob, CatalogMode, ComparatorKind};

/// Contents of a TOML job file.
///
/// ```toml
/// profile = "documents"
/// sources = ["/home/me/docs", "/home/me/photos"]
/// destinations = ["/mnt/backup"]
/// compare = "hash"
/// mode = "persistent"
/// history = 2
/// archive = false
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobFile {
    #[serde(default = "default_profile")]
    pub profile: String,
    pub sources: Vec<PathBuf>,
    pub destinations: Vec<PathBuf>,
    #[serde(default)]
    pub compare: ComparatorKind,
    #[serde(default)]
    pub mode: CatalogMode,
    #[serde(default)]
    pub history: u32,
    #[serde(default)]
    pub archive: bool,
    pub archiver: Option<String>,
    pub catalog: Option<PathBuf>,
}

fn default_profile() -> String {
    "backup".to_string()
}

impl JobFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BackupError::io(path, e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| BackupError::Config(e.to_string()))
    }
}

pub struct Config {
    pub jobs: Vec<BackupJob>,
    pub catalog_path: PathBuf,
    pub archive: bool,
    pub archiver: String,
    pub json_output: bool,
    pub verbose: bool,
}

impl Config {
    /// A job file, when given, supplies every job setting; the command line
    /// only adds output options and a catalogue override.
    pub fn from_run_args(args: &RunArgs) -> Result<Self> {
        match &args.config {
            Some(path) => {
                let file = JobFile::load(path)?;
                let jobs = build_jobs(
                    &file.profile,
                    &file.sources,
                    &file.destinations,
                    file.compare,
                    file.history,
                    file.mode,
                )?;

                let catalog = args.catalog.as_deref().or(file.catalog.as_deref());

                Ok(Config {
                    jobs,
                    catalog_path: resolve_catalog_path(catalog)?,
                    archive: file.archive || args.archive,
                    archiver: file.archiver.unwrap_or_else(|| DEFAULT_ARCHIVER.to_string()),
                    json_output: args.json,
                    verbose: args.verbose,
                })
            }
            None => {
                let jobs = build_jobs(
                    &default_profile(),
                    &args.inputs,
                    &args.outputs,
                    args.compare,
                    args.history,
                    args.mode,
                )?;

                Ok(Config {
                    jobs,
                    catalog_path: resolve_catalog_path(args.catalog.as_deref())?,
                    archive: args.archive,
                    archiver: DEFAULT_ARCHIVER.to_string(),
                    json_output: args.json,
                    verbose: args.verbose,
                })
            }
        }
    }
}

/// Pairs sources with destinations.
///
/// Equal counts pair up by position. A single destination receives every
/// source under a directory named after that source. Anything else is a
/// configuration error, raised before any job exists.
pub fn build_jobs(
    profile: &str,
    sources: &[PathBuf],
    destinations: &[PathBuf],
    compare: ComparatorKind,
    history: u32,
    mode: CatalogMode,
) -> Result<Vec<BackupJob>> {
    if sources.is_empty() {
        return Err(BackupError::Config("at least one source is required".into()));
    }

    let pairs: Vec<(PathBuf, PathBuf)> = if sources.len() == destinations.len() {
        sources
            .iter()
            .zip(destinations)
            .map(|(s, d)| -> Result<(PathBuf, PathBuf)> { Ok((absolutize(s)?, absolutize(d)?)) })
            .collect::<Result<_>>()?
    } else if destinations.len() == 1 {
        let base = absolutize(&destinations[0])?;
        sources
            .iter()
            .map(|s| -> Result<(PathBuf, PathBuf)> {
                let source = absolutize(s)?;
                let name = source.file_name().ok_or_else(|| {
                    BackupError::Config(format!("source {} has no file name", source.display()))
                })?;
                let dest = base.join(name);
                Ok((source, dest))
            })
            .collect::<Result<_>>()?
    } else {
        return Err(BackupError::Config(format!(
            "the number of destinations must be 1 or equal to the number of sources ({} sources, {} destinations)",
            sources.len(),
            destinations.len()
        )));
    };

    let many = pairs.len() > 1;
    let mut jobs: Vec<BackupJob> = Vec::with_capacity(pairs.len());

    for (index, (source, dest)) in pairs.into_iter().enumerate() {
        let name = if many {
            format!("{profile}-{}", index + 1)
        } else {
            profile.to_string()
        };

        let job = BackupJob::new(name, source, dest)
            .with_comparator(compare)
            .with_retention(history)
            .with_catalog_mode(mode);
        job.validate()?;

        if let Some(other) = jobs.iter().find(|j| j.dest_root == job.dest_root) {
            return Err(BackupError::Config(format!(
                "jobs '{}' and '{}' share the destination {}",
                other.name,
                job.name,
                job.dest_root.display()
            )));
        }

        jobs.push(job);
    }

    Ok(jobs)
}

/// Explicit path if given, otherwise `<data dir>/rotback/catalog.db`.
pub fn resolve_catalog_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return absolutize(path);
    }

    let data_dir = directories::ProjectDirs::from("", "", "rotback")
        .ok_or_else(|| BackupError::Config("could not determine data directory".into()))?
        .data_dir()
        .to_path_buf();

    Ok(data_dir.join("catalog.db"))
}

/// Anchors relative paths at the current directory and drops `.` components.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(BackupError::Config("empty path".into()));
    }

    let anchored = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir().map_err(|e| BackupError::io(".", e))?;
        cwd.join(path)
    };

    Ok(anchored
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(list: &[&str]) -> Vec<PathBuf> {
        list.iter().map(PathBuf::from).collect()
    }

    fn jobs(sources: &[&str], dests: &[&str]) -> Result<Vec<BackupJob>> {
        build_jobs("p", &paths(sources), &paths(dests), ComparatorKind::Hash, 2, CatalogMode::Stateless)
    }

    #[test]
    fn equal_counts_pair_by_position() {
        let jobs = jobs(&["/a", "/b"], &["/x", "/y"]).unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].dest_root, PathBuf::from("/x"));
        assert_eq!(jobs[1].dest_root, PathBuf::from("/y"));
        assert_eq!(jobs[1].name, "p-2");
        assert_eq!(jobs[0].comparator, ComparatorKind::Hash);
        assert_eq!(jobs[0].retention, 2);
        assert_eq!(jobs[0].catalog_mode, CatalogMode::Stateless);
    }

    #[test]
    fn single_destination_fans_out_by_source_name() {
        let jobs = jobs(&["/data/docs", "/data/photos"], &["/backup"]).unwrap();

        assert_eq!(jobs[0].dest_root, PathBuf::from("/backup/docs"));
        assert_eq!(jobs[1].dest_root, PathBuf::from("/backup/photos"));
    }

    #[test]
    fn single_job_takes_the_profile_name() {
        let jobs = jobs(&["/data/docs"], &["/backup"]).unwrap();
        assert_eq!(jobs[0].name, "p");
    }

    #[test]
    fn mismatched_counts_are_config_errors() {
        assert!(matches!(jobs(&["/a", "/b", "/c"], &["/x", "/y"]), Err(BackupError::Config(_))));
        assert!(matches!(jobs(&[], &["/x"]), Err(BackupError::Config(_))));
    }

    #[test]
    fn colliding_destinations_are_config_errors() {
        assert!(matches!(
            jobs(&["/one/docs", "/two/docs"], &["/backup"]),
            Err(BackupError::Config(_))
        ));
    }

    #[test]
    fn relative_paths_are_anchored() {
        let path = absolutize(Path::new("./some/dir")).unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("some/dir"));
        assert!(!path.components().any(|c| matches!(c, Component::CurDir)));
    }

    #[test]
    fn job_file_defaults() {
        let file = JobFile::parse(
            r#"
            sources = ["/a"]
            destinations = ["/b"]
            "#,
        )
        .unwrap();

        assert_eq!(file.profile, "backup");
        assert_eq!(file.compare, ComparatorKind::Time);
        assert_eq!(file.mode, CatalogMode::Persistent);
        assert_eq!(file.history, 0);
        assert!(!file.archive);
    }

    #[test]
    fn job_file_accepts_legacy_names() {
        let file = JobFile::parse(
            r#"
            profile = "docs"
            sources = ["/a"]
            destinations = ["/b"]
            compare = "bydate"
            mode = "database"
            history = 3
            "#,
        )
        .unwrap();

        assert_eq!(file.profile, "docs");
        assert_eq!(file.compare, ComparatorKind::Time);
        assert_eq!(file.mode, CatalogMode::Persistent);
        assert_eq!(file.history, 3);
    }

    #[test]
    fn unknown_settings_are_rejected() {
        let err = JobFile::parse("sources = [\"/a\"]\ndestinations = [\"/b\"]\ncompare = \"bysize\"").unwrap_err();
        assert!(matches!(err, BackupError::Config(_)));

        let err = JobFile::parse("sources = [\"/a\"]\ndestinations = [\"/b\"]\npassword = \"x\"").unwrap_err();
        assert!(matches!(err, BackupError::Config(_)));
    }

    #[test]
    fn explicit_catalog_path_wins() {
        let path = resolve_catalog_path(Some(Path::new("/var/lib/rotback.db"))).unwrap();
        assert_eq!(path, PathBuf::from("/var/lib/rotback.db"));
    }
}
