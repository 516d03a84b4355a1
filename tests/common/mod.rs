#![allow(dead_code)]

use sis_etl::{canonical_header, COURSES_HEADERS, STUDENTS_HEADERS, STUDENT_SCHEDULES_HEADERS, TEACHERS_HEADERS};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary `<base>/psexport` input tree; outputs go to `<base>/datafiles`.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("psexport")).unwrap();
        Self { dir }
    }

    pub fn base(&self) -> &Path {
        self.dir.path()
    }

    pub fn input(&self) -> PathBuf {
        self.dir.path().join("psexport")
    }

    pub fn output(&self) -> PathBuf {
        self.dir.path().join("datafiles")
    }

    /// Write `rows` to `<input>/<name>`. `header` rows are written first, verbatim.
    pub fn write(&self, name: &str, header: Option<&[&str]>, rows: &[Vec<String>]) -> PathBuf {
        let path = self.input().join(name);
        write_tsv(&path, header, rows);
        path
    }

    /// Write raw `bytes` to `<input>/<name>`, for extracts that are not valid UTF-8.
    pub fn write_bytes(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.input().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    pub fn students(&self, rows: &[Vec<String>]) -> PathBuf {
        self.write("dd-students.txt", None, rows)
    }

    pub fn teachers(&self, rows: &[Vec<String>]) -> PathBuf {
        self.write("dd-teachers.txt", None, rows)
    }

    pub fn courses(&self, school: &str, rows: &[Vec<String>]) -> PathBuf {
        self.write(&format!("dd-courses-{school}.txt"), None, rows)
    }

    pub fn rosters(&self, school: &str, rows: &[Vec<String>]) -> PathBuf {
        self.write(&format!("dd-rosters-{school}.txt"), None, rows)
    }

    pub fn races(&self, rows: &[(&str, &str)]) -> PathBuf {
        let rows: Vec<Vec<String>> = rows.iter().map(|(s, r)| vec![s.to_string(), r.to_string()]).collect();
        self.write("dd-races.txt", Some(&["STUDENTID", "RACECD"]), &rows)
    }

    /// Program rows: (student id, program code, start, end, custom).
    pub fn programs(&self, rows: &[(&str, &str, &str, &str, &str)]) -> PathBuf {
        let rows: Vec<Vec<String>> = rows
            .iter()
            .map(|(s, c, a, b, x)| vec![s.to_string(), c.to_string(), a.to_string(), b.to_string(), x.to_string()])
            .collect();
        self.write(
            "dd-programs.txt",
            Some(&["FOREIGNKEY", "USER_DEFINED_TEXT", "USER_DEFINED_DATE", "USER_DEFINED_DATE2", "CUSTOM"]),
            &rows,
        )
    }
}

pub fn write_tsv(path: &Path, header: Option<&[&str]>, rows: &[Vec<String>]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut f = File::create(path).unwrap();
    if let Some(h) = header {
        writeln!(f, "{}", h.join("\t")).unwrap();
    }
    for r in rows {
        writeln!(f, "{}", r.join("\t")).unwrap();
    }
}

/// Positional row for `headers`: defaults first, then `overrides` keyed by canonical column name.
fn positional(headers: &[&str], defaults: &[(&str, &str)], overrides: &[(&str, &str)]) -> Vec<String> {
    headers
        .iter()
        .map(|h| {
            let key = canonical_header(h);
            overrides
                .iter()
                .chain(defaults.iter())
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
                .unwrap_or_default()
        })
        .collect()
}

/// Student row enrolled via status 0 at school 100 / code 7, grade 5.
pub fn student_row(id: &str, overrides: &[(&str, &str)]) -> Vec<String> {
    let number = format!("S{id}");
    let ssid = format!("99{id}");
    let defaults = [
        ("id", id),
        ("student_number", number.as_str()),
        ("state_studentnumber", ssid.as_str()),
        ("schoolid", "100"),
        ("first_name", "Pat"),
        ("last_name", "Lee"),
        ("dob", "3/4/98"),
        ("fedethnicity", "0"),
        ("gender", "F"),
        ("enroll_status", "0"),
        ("grade_level", "5"),
        ("mother_first", "Ann"),
        ("mother", "Lee"),
        ("father_first", "Bob"),
        ("father", "Lee"),
        ("street", "1 Main St"),
        ("city", "Kentfield"),
        ("state", "CA"),
        ("zip", "94904"),
        ("home_phone", "555-0100"),
        ("schoolentrydate", "8/25/2008"),
        ("districtentrydate", "8/25/2008"),
        ("entrydate", "8/25/2008"),
        ("alternate_school_number", "7"),
        ("ca_parented", "12"),
        ("ca_primarylanguage", "00"),
        ("ca_elastatus", "EO"),
    ];
    positional(STUDENTS_HEADERS, &defaults, overrides)
}

/// Active teacher (status 1, staffstatus 1) at school 100 / code 7.
pub fn teacher_row(id: &str, overrides: &[(&str, &str)]) -> Vec<String> {
    let number = format!("T{id}");
    let defaults = [
        ("id", id),
        ("teachernumber", number.as_str()),
        ("schoolid", "100"),
        ("alternate_school_number", "7"),
        ("first_name", "Terry"),
        ("last_name", "Ng"),
        ("email_addr", "t@example.org"),
        ("status", "1"),
        ("staffstatus", "1"),
    ];
    positional(TEACHERS_HEADERS, &defaults, overrides)
}

pub fn course_row(number: &str, name: &str) -> Vec<String> {
    let defaults = [
        ("course_number", number),
        ("course_name", name),
        ("credit_hours", "5"),
        ("credittype", "MATH"),
        ("schoolid", "100"),
        ("alternate_school_number", "7"),
    ];
    positional(COURSES_HEADERS, &defaults, &[])
}

/// Roster row in term 2000 ("10-11" full year), period 2.
pub fn roster_row(student: &str, teacher: &str, course: &str, overrides: &[(&str, &str)]) -> Vec<String> {
    let defaults = [
        ("studentid", student),
        ("teacherid", teacher),
        ("schoolid", "100"),
        ("termid", "2000"),
        ("alternate_school_number", "7"),
        ("expression", "2(A)"),
        ("abbreviation", "10-11"),
        ("course_number", course),
        ("sectionid", "501"),
    ];
    positional(STUDENT_SCHEDULES_HEADERS, &defaults, overrides)
}

/// Read a text file line-by-line into strings.
pub fn read_lines(path: &Path) -> Vec<String> {
    let f = File::open(path).unwrap();
    let r = BufReader::new(f);
    r.lines().map(|l| l.unwrap()).filter(|s| !s.is_empty()).collect()
}

/// Data rows of an output file, split into cells (header dropped).
pub fn read_records(path: &Path) -> Vec<Vec<String>> {
    read_lines(path)
        .into_iter()
        .skip(1)
        .map(|l| l.split('\t').map(str::to_string).collect())
        .collect()
}

/// File names in `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut v: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    v.sort();
    v
}
