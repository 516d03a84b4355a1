//! Typed rows for each extract family, with the positional headers the extracts use
//! when they are written without a header row.

use crate::tsv::{Row, SourceRecord};

// NOTE: custom-field column names can differ between SIS installations; the bracketed
// ordinal prefix ("[39]") is stripped by header canonicalization.

pub const STUDENTS_HEADERS: &[&str] = &[
    "id",
    "student_number",
    "state_studentnumber",
    "schoolid",
    "first_name",
    "last_name",
    "dob",
    "fedethnicity",
    "gender",
    "enroll_status",
    "grade_level",
    "mother_first",
    "mother",
    "father_first",
    "father",
    "street",
    "city",
    "state",
    "zip",
    "home_phone",
    "schoolentrydate",
    "districtentrydate",
    "entrydate",
    "exitdate",
    "[39]alternate_school_number",
    "ca_parented",
    "ca_primarylanguage",
    "ca_elastatus",
    "ca_daterfep",
    "ca_firstusaschooling",
    "ca_gate",
    "ca_migranted",
    "ca_primdisability",
    "ca_titlei_targeted",
    "ethnicity",
];

pub const TEACHERS_HEADERS: &[&str] = &[
    "id",
    "teachernumber",
    "schoolid",
    "[39]alternate_school_number",
    "first_name",
    "last_name",
    "email_addr",
    "status",
    "staffstatus",
];

pub const COURSES_HEADERS: &[&str] = &[
    "course_number",
    "course_name",
    "credit_hours",
    "credittype",
    "ca_courselevel",
    "schoolid",
    "[39]alternate_school_number",
];

pub const STUDENT_SCHEDULES_HEADERS: &[&str] = &[
    "studentid",
    "teacherid",
    "schoolid",
    "termid",
    "[01]state_studentnumber",
    "[05]teachernumber",
    "[39]alternate_school_number",
    "[01]grade_level",
    "expression",
    "abbreviation",
    "course_number",
    "section_number",
    "sectionid",
];

/// Student demographic extract row.
#[derive(Clone, Debug, Default)]
pub struct StudentRow {
    pub id: String,
    pub student_number: String,
    pub ssid: String,
    pub school_id: String,
    pub school_code: String,
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
    pub fed_ethnicity: String,
    pub gender: String,
    pub enroll_status: String,
    pub grade_level: String,
    pub mother_first: String,
    pub mother: String,
    pub father_first: String,
    pub father: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub home_phone: String,
    pub school_entry_date: String,
    pub district_entry_date: String,
    pub entry_date: String,
    pub parent_education: String,
    pub primary_language: String,
    pub ela_status: String,
    pub date_rfep: String,
    pub first_us_schooling: String,
    // Present only in extracts that carry program flags and ethnicity directly.
    pub gate: Option<String>,
    pub migrant_ed: Option<String>,
    pub primary_disability: Option<String>,
    pub title1_targeted: Option<String>,
    pub ethnicity: Option<String>,
}

impl SourceRecord for StudentRow {
    const PROBE: &'static str = "ID";
    const FALLBACK_HEADERS: &'static [&'static str] = STUDENTS_HEADERS;
    const REQUIRED: &'static [&'static str] = &[
        "id", "student_number", "state_studentnumber", "schoolid", "first_name", "last_name",
        "dob", "fedethnicity", "gender", "enroll_status", "grade_level", "mother_first",
        "mother", "father_first", "father", "street", "city", "state", "zip", "home_phone",
        "schoolentrydate", "districtentrydate", "entrydate", "alternate_school_number",
        "ca_parented", "ca_primarylanguage", "ca_elastatus", "ca_daterfep", "ca_firstusaschooling",
    ];

    fn from_row(row: &Row<'_>) -> Self {
        Self {
            id: row.string("id"),
            student_number: row.string("student_number"),
            ssid: row.string("state_studentnumber"),
            school_id: row.string("schoolid"),
            school_code: row.string("alternate_school_number"),
            first_name: row.string("first_name"),
            last_name: row.string("last_name"),
            dob: row.string("dob"),
            fed_ethnicity: row.string("fedethnicity"),
            gender: row.string("gender"),
            enroll_status: row.string("enroll_status"),
            grade_level: row.string("grade_level"),
            mother_first: row.string("mother_first"),
            mother: row.string("mother"),
            father_first: row.string("father_first"),
            father: row.string("father"),
            street: row.string("street"),
            city: row.string("city"),
            state: row.string("state"),
            zip: row.string("zip"),
            home_phone: row.string("home_phone"),
            school_entry_date: row.string("schoolentrydate"),
            district_entry_date: row.string("districtentrydate"),
            entry_date: row.string("entrydate"),
            parent_education: row.string("ca_parented"),
            primary_language: row.string("ca_primarylanguage"),
            ela_status: row.string("ca_elastatus"),
            date_rfep: row.string("ca_daterfep"),
            first_us_schooling: row.string("ca_firstusaschooling"),
            gate: row.opt_string("ca_gate"),
            migrant_ed: row.opt_string("ca_migranted"),
            primary_disability: row.opt_string("ca_primdisability"),
            title1_targeted: row.opt_string("ca_titlei_targeted"),
            ethnicity: row.opt_string("ethnicity"),
        }
    }
}

/// Teacher/staff extract row.
#[derive(Clone, Debug, Default)]
pub struct TeacherRow {
    pub id: String,
    pub teacher_number: String,
    pub school_id: String,
    pub school_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub status: String,
    pub staff_status: String,
    pub datadirector_access: Option<String>,
}

impl SourceRecord for TeacherRow {
    const PROBE: &'static str = "ID";
    const FALLBACK_HEADERS: &'static [&'static str] = TEACHERS_HEADERS;
    const REQUIRED: &'static [&'static str] = &[
        "id", "teachernumber", "schoolid", "alternate_school_number", "first_name", "last_name",
        "email_addr", "status", "staffstatus",
    ];

    fn from_row(row: &Row<'_>) -> Self {
        Self {
            id: row.string("id"),
            teacher_number: row.string("teachernumber"),
            school_id: row.string("schoolid"),
            school_code: row.string("alternate_school_number"),
            first_name: row.string("first_name"),
            last_name: row.string("last_name"),
            email: row.string("email_addr"),
            status: row.string("status"),
            staff_status: row.string("staffstatus"),
            datadirector_access: row.opt_string("datadirector_access"),
        }
    }
}

/// Course catalog row.
#[derive(Clone, Debug, Default)]
pub struct CourseRow {
    pub course_number: String,
    pub course_name: String,
    pub credit_hours: String,
    pub credit_type: String,
    pub school_id: String,
    pub school_code: String,
}

impl SourceRecord for CourseRow {
    const PROBE: &'static str = "COURSE_NUMBER";
    const FALLBACK_HEADERS: &'static [&'static str] = COURSES_HEADERS;
    const REQUIRED: &'static [&'static str] =
        &["course_number", "course_name", "credit_hours", "credittype", "schoolid", "alternate_school_number"];

    fn from_row(row: &Row<'_>) -> Self {
        Self {
            course_number: row.string("course_number"),
            course_name: row.string("course_name"),
            credit_hours: row.string("credit_hours"),
            credit_type: row.string("credittype"),
            school_id: row.string("schoolid"),
            school_code: row.string("alternate_school_number"),
        }
    }
}

/// Student schedule (roster) row.
#[derive(Clone, Debug, Default)]
pub struct RosterRow {
    pub student_id: String,
    pub teacher_id: String,
    pub school_id: String,
    pub term_id: String,
    pub school_code: String,
    pub expression: String,
    pub abbreviation: String,
    pub course_number: String,
    pub section_id: String,
}

impl SourceRecord for RosterRow {
    const PROBE: &'static str = "STUDENTID";
    const FALLBACK_HEADERS: &'static [&'static str] = STUDENT_SCHEDULES_HEADERS;
    const REQUIRED: &'static [&'static str] = &[
        "studentid", "teacherid", "schoolid", "termid", "alternate_school_number", "expression",
        "abbreviation", "course_number", "sectionid",
    ];

    fn from_row(row: &Row<'_>) -> Self {
        Self {
            student_id: row.string("studentid"),
            teacher_id: row.string("teacherid"),
            school_id: row.string("schoolid"),
            term_id: row.string("termid"),
            school_code: row.string("alternate_school_number"),
            expression: row.string("expression"),
            abbreviation: row.string("abbreviation"),
            course_number: row.string("course_number"),
            section_id: row.string("sectionid"),
        }
    }
}

/// Race extract row (always written with a header).
#[derive(Clone, Debug, Default)]
pub struct RaceRow {
    pub student_id: String,
    pub race_code: String,
}

impl SourceRecord for RaceRow {
    const PROBE: &'static str = "STUDENTID";
    const FALLBACK_HEADERS: &'static [&'static str] = &[];
    const REQUIRED: &'static [&'static str] = &["studentid", "racecd"];

    fn from_row(row: &Row<'_>) -> Self {
        Self { student_id: row.string("studentid"), race_code: row.string("racecd") }
    }
}

/// Special-program membership row (always written with a header).
#[derive(Clone, Debug, Default)]
pub struct ProgramRow {
    pub student_id: String,
    pub program_code: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub custom: Option<Vec<u8>>,
}

impl SourceRecord for ProgramRow {
    const PROBE: &'static str = "FOREIGNKEY";
    const FALLBACK_HEADERS: &'static [&'static str] = &[];
    const REQUIRED: &'static [&'static str] = &["foreignkey", "user_defined_text"];

    fn from_row(row: &Row<'_>) -> Self {
        Self {
            student_id: row.string("foreignkey"),
            program_code: row.string("user_defined_text"),
            start_date: row.opt_string("user_defined_date"),
            end_date: row.opt_string("user_defined_date2"),
            custom: row.bytes("custom").map(<[u8]>::to_vec),
        }
    }
}
