use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const STUDENTS_FILE: &str = "dd-students.txt";
pub const TEACHERS_FILE: &str = "dd-teachers.txt";
pub const RACES_FILE: &str = "dd-races.txt";
pub const PROGRAMS_FILE: &str = "dd-programs.txt";

/// Source families split into per-school extracts (`dd-<family>-<school>.txt`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum VariantFamily {
    Courses,
    Rosters,
}

impl VariantFamily {
    fn stem(self) -> &'static str {
        match self {
            VariantFamily::Courses => "courses",
            VariantFamily::Rosters => "rosters",
        }
    }
}

/// Per-school variant files found in the input directory, by family then school.
/// The aggregate extract is recorded under school `all`.
fn discover_variants(dir: &Path) -> BTreeMap<(VariantFamily, String), PathBuf> {
    let re = Regex::new(r"^dd-(courses|rosters)-([A-Za-z0-9_]+)\.txt$").unwrap();
    let mut map = BTreeMap::new();
    if !dir.exists() {
        return map;
    }
    for ent in WalkDir::new(dir).min_depth(1).max_depth(1).into_iter().flatten() {
        if !ent.file_type().is_file() {
            continue;
        }
        let Some(name) = ent.file_name().to_str() else { continue };
        if let Some(caps) = re.captures(name) {
            let family = if &caps[1] == "courses" { VariantFamily::Courses } else { VariantFamily::Rosters };
            map.insert((family, caps[2].to_string()), ent.path().to_path_buf());
        }
    }
    map
}

/// Resolved input files of one run. Single-file families are plain paths (their absence is
/// handled by the analyzer); variant families list only files that exist.
#[derive(Clone, Debug)]
pub struct InputLayout {
    pub students: PathBuf,
    pub teachers: PathBuf,
    pub races: PathBuf,
    pub programs: PathBuf,
    pub courses: Vec<PathBuf>,
    pub rosters: Vec<PathBuf>,
}

impl InputLayout {
    /// When `dd-<family>-all.txt` exists it is the only file read for that family; otherwise
    /// every present `dd-<family>-<school>.txt` is read in `schools` order. Missing school
    /// files are silently skipped.
    pub fn discover(input_dir: &Path, schools: &[String]) -> Self {
        let found = discover_variants(input_dir);
        let pick = |family: VariantFamily| -> Vec<PathBuf> {
            if let Some(all) = found.get(&(family, "all".to_string())) {
                return vec![all.clone()];
            }
            let files: Vec<PathBuf> = schools
                .iter()
                .filter_map(|s| found.get(&(family, s.clone())).cloned())
                .collect();
            if files.is_empty() {
                tracing::warn!(dir = %input_dir.display(), "no {} files found", family.stem());
            }
            files
        };
        Self {
            students: input_dir.join(STUDENTS_FILE),
            teachers: input_dir.join(TEACHERS_FILE),
            races: input_dir.join(RACES_FILE),
            programs: input_dir.join(PROGRAMS_FILE),
            courses: pick(VariantFamily::Courses),
            rosters: pick(VariantFamily::Rosters),
        }
    }
}
