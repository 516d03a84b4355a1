#[path = "common/mod.rs"]
mod common;

use common::*;
use sis_etl::analyzers::*;
use sis_etl::{BatchContext, ETLOptions, EtlError, NegativeIdPolicy, Program, Reject, SchoolYear};
use time::macros::date;

fn year(label: &str) -> SchoolYear {
    label.parse().unwrap()
}

fn ctx() -> BatchContext {
    BatchContext::new(date!(2011 - 01 - 10))
}

#[test]
fn entry_date_decides_enrollment_year() {
    let fx = Fixture::new();
    let path = fx.students(&[student_row("1", &[("enroll_status", "1"), ("entrydate", "09/01/2010")])]);
    let opts = ETLOptions::default();

    let mut c = ctx();
    analyze_students(&mut c, &path, year("10-11"), &opts).unwrap();
    assert!(c.store.enrollment(year("10-11"), "1").is_some());

    let mut c = ctx();
    analyze_students(&mut c, &path, year("09-10"), &opts).unwrap();
    assert!(c.store.has_student("1"));
    assert!(c.store.enrollment(year("09-10"), "1").is_none());
}

#[test]
fn status_zero_always_enrolls_and_negative_never_does() {
    let fx = Fixture::new();
    let path = fx.students(&[
        student_row("1", &[("enroll_status", "0"), ("entrydate", "garbage")]),
        student_row("2", &[("enroll_status", "-1"), ("entrydate", "09/01/2010")]),
    ]);
    let mut c = ctx();
    analyze_students(&mut c, &path, year("05-06"), &ETLOptions::default()).unwrap();
    let e = c.store.enrollment(year("05-06"), "1").unwrap();
    assert_eq!(e.school_code.as_deref(), Some("7"));
    assert_eq!(e.grade_level.as_deref(), Some("5"));
    assert!(c.store.enrollment(year("05-06"), "2").is_none());
}

#[test]
fn unparsable_entry_date_is_fatal() {
    let fx = Fixture::new();
    let path = fx.students(&[student_row("1", &[("enroll_status", "2"), ("entrydate", "someday")])]);
    let err = analyze_students(&mut ctx(), &path, year("10-11"), &ETLOptions::default()).unwrap_err();
    match err.downcast_ref::<EtlError>() {
        Some(EtlError::UnparsableEntryDate { student_id, raw }) => {
            assert_eq!(student_id, "1");
            assert_eq!(raw, "someday");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn student_attributes_are_normalized() {
    let fx = Fixture::new();
    let path = fx.students(&[
        student_row("1", &[("mother_first", ""), ("mother", " "), ("ca_elastatus", "rfep"), ("fedethnicity", "1")]),
        student_row("2", &[("dob", "2/30/2150")]),
    ]);
    let mut c = ctx();
    analyze_students(&mut c, &path, year("10-11"), &ETLOptions::default()).unwrap();

    let s = c.store.student("1").unwrap();
    assert_eq!(s.parent.as_deref(), Some("Bob Lee"));
    assert_eq!(s.birthdate.as_deref(), Some("03/04/1998"));
    assert_eq!(s.language_fluency, Some(4));
    assert_eq!(s.ethnicity.as_deref(), Some("500"));
    assert_eq!(s.student_number.as_deref(), Some("S1"));

    let s = c.store.student("2").unwrap();
    assert_eq!(s.parent.as_deref(), Some("Ann Lee"));
    assert_eq!(s.birthdate, None);
    assert_eq!(s.ethnicity, None);
}

#[test]
fn single_school_filter_skips_other_schools() {
    let fx = Fixture::new();
    let path = fx.students(&[student_row("1", &[]), student_row("2", &[("schoolid", "200")])]);
    let opts = ETLOptions::default().with_single_school(Some(200));
    let mut c = ctx();
    analyze_students(&mut c, &path, year("10-11"), &opts).unwrap();
    assert!(!c.store.has_student("1"));
    assert!(c.store.enrollment(year("10-11"), "1").is_none());
    assert!(c.store.has_student("2"));
    assert_eq!(c.tally.count(Reject::OutsideSchool), 1);
}

#[test]
fn row_flags_never_reset() {
    let fx = Fixture::new();
    let first = fx.write(
        "pass1.txt",
        None,
        &[student_row(
            "1",
            &[("ca_gate", "YES - identified"), ("ca_primdisability", "320"), ("ca_titlei_targeted", "Y")],
        )],
    );
    let second = fx.write("pass2.txt", None, &[student_row("1", &[("ca_gate", "No"), ("ca_primdisability", "000")])]);
    let opts = ETLOptions::default();
    let mut c = ctx();
    analyze_students(&mut c, &first, year("09-10"), &opts).unwrap();
    analyze_students(&mut c, &second, year("10-11"), &opts).unwrap();

    let s = c.store.student("1").unwrap();
    let flags = s.flags();
    assert!(flags.get(Program::Gate));
    assert!(flags.get(Program::SpecialProgram));
    assert!(flags.get(Program::Title1));
    assert!(!flags.get(Program::MigrantEd));
    assert!(!flags.get(Program::Nslp));
    assert_eq!(s.primary_disability.as_deref(), Some("320"));
}

#[test]
fn race_enrichment_is_first_writer_wins_and_idempotent() {
    let fx = Fixture::new();
    let students = fx.students(&[student_row("1", &[]), student_row("2", &[("ethnicity", "100")])]);
    let races = fx.races(&[("1", "700"), ("1", "200"), ("2", "600"), ("9", "300")]);
    let opts = ETLOptions::default().with_race_file(true);

    let mut c = ctx();
    analyze_students(&mut c, &students, year("10-11"), &opts).unwrap();
    assert_eq!(c.store.student("1").unwrap().ethnicity, None);

    assert_eq!(analyze_races(&mut c, &races).unwrap(), Some(4));
    assert_eq!(c.store.student("1").unwrap().ethnicity.as_deref(), Some("700"));
    assert_eq!(c.store.student("2").unwrap().ethnicity.as_deref(), Some("100"));
    assert!(!c.store.has_student("9"));
    assert_eq!(c.tally.count(Reject::UnknownStudent), 1);

    analyze_races(&mut c, &races).unwrap();
    assert_eq!(c.store.student("1").unwrap().ethnicity.as_deref(), Some("700"));
    assert_eq!(c.store.student("2").unwrap().ethnicity.as_deref(), Some("100"));
}

#[test]
fn absent_race_file_is_skipped() {
    let fx = Fixture::new();
    let mut c = ctx();
    assert_eq!(analyze_races(&mut c, &fx.input().join("dd-races.txt")).unwrap(), None);
    assert_eq!(c.rows.races, 0);
}

#[test]
fn active_program_rows_set_flags() {
    let fx = Fixture::new();
    let students = fx.students(&[student_row("1", &[]), student_row("2", &[])]);
    let sped = "\x11\x04\x06\x12\x00\x03280\x11\x04\x03\x12\x00\x03320";
    let programs = fx.programs(&[
        ("1", "122", "0/0/0", "", ""),
        ("1", "127", "09/01/2010", "06/30/2011", ""),
        ("1", "144", "", "01/01/1900", sped),
        ("1", "175", "09/01/2010", "12/31/2010", ""),
        ("2", "135", "02/01/2011", "", ""),
        ("2", "999", "", "", ""),
        ("7", "127", "", "", ""),
    ]);
    let opts = ETLOptions::default().with_program_file(true);
    let mut c = ctx();
    analyze_students(&mut c, &students, year("10-11"), &opts).unwrap();
    assert_eq!(analyze_programs(&mut c, &programs).unwrap(), Some(7));

    let one = c.store.student("1").unwrap();
    assert!(one.flags().get(Program::Title1));
    assert!(one.flags().get(Program::Gate));
    assert!(one.flags().get(Program::SpecialProgram));
    assert!(!one.flags().get(Program::Nslp));
    assert_eq!(one.primary_disability.as_deref(), Some("320"));

    let two = c.store.student("2").unwrap();
    assert!(!two.flags().get(Program::MigrantEd));
    assert_eq!(c.tally.count(Reject::InactiveProgram), 2);
    assert_eq!(c.tally.count(Reject::UnknownProgram), 1);
    assert_eq!(c.tally.count(Reject::UnknownStudent), 1);
}

#[test]
fn special_ed_row_without_disability_code_is_fatal() {
    let fx = Fixture::new();
    let students = fx.students(&[student_row("1", &[])]);
    let programs = fx.programs(&[("1", "144", "", "", "no code here")]);
    let mut c = ctx();
    analyze_students(&mut c, &students, year("10-11"), &ETLOptions::default()).unwrap();
    let err = analyze_programs(&mut c, &programs).unwrap_err();
    assert!(matches!(err.downcast_ref::<EtlError>(), Some(EtlError::DisabilityCodeMissing { .. })));
}

#[test]
fn non_utf8_custom_field_still_yields_disability() {
    let fx = Fixture::new();
    let students = fx.students(&[student_row("1", &[])]);
    let mut bytes = b"FOREIGNKEY\tUSER_DEFINED_TEXT\tUSER_DEFINED_DATE\tUSER_DEFINED_DATE2\tCUSTOM\n".to_vec();
    bytes.extend_from_slice(b"1\t144\t\t\t\x11\x04\x05\x12\x00\x02\xff\x80\x11\x04\x03\x12\x00\x03320\n");
    let programs = fx.write_bytes("dd-programs.txt", &bytes);

    let mut c = ctx();
    analyze_students(&mut c, &students, year("10-11"), &ETLOptions::default()).unwrap();
    assert_eq!(analyze_programs(&mut c, &programs).unwrap(), Some(1));
    let one = c.store.student("1").unwrap();
    assert!(one.flags().get(Program::SpecialProgram));
    assert_eq!(one.primary_disability.as_deref(), Some("320"));
}

#[test]
fn teacher_activity_requires_qualifying_status() {
    let fx = Fixture::new();
    let header = [
        "ID", "TEACHERNUMBER", "SCHOOLID", "[39]ALTERNATE_SCHOOL_NUMBER", "FIRST_NAME", "LAST_NAME", "EMAIL_ADDR",
        "STATUS", "STAFFSTATUS", "DATADIRECTOR_ACCESS",
    ];
    let rows: Vec<Vec<String>> = [
        ["1", "T1", "100", "7", "A", "One", "a@x", "1", "1", ""],
        ["2", "T2", "100", "7", "B", "Two", "b@x", "1", "0", "1"],
        ["3", "T3", "100", "7", "C", "Three", "c@x", "1", "0", "0"],
        ["4", "T4", "100", "7", "D", "Four", "d@x", "2", "1", "1"],
    ]
    .iter()
    .map(|r| r.iter().map(|s| s.to_string()).collect())
    .collect();
    let path = fx.write("dd-teachers.txt", Some(&header), &rows);

    let mut c = ctx();
    analyze_teachers(&mut c, &path, year("10-11")).unwrap();
    let active: Vec<&String> = c.store.active_teachers(year("10-11")).collect();
    assert_eq!(active, vec!["1", "2"]);
    assert_eq!(c.store.user("3").unwrap().employee_id.as_deref(), Some("T3"));
    assert_eq!(c.store.active_teachers(year("09-10")).count(), 0);
}

#[test]
fn course_rows_derive_abbreviations() {
    let fx = Fixture::new();
    let path = fx.courses("all", &[course_row("PE1", "Physical Education K"), course_row("ALG", "Algebra 1")]);
    let mut c = ctx();
    assert_eq!(analyze_courses(&mut c, &[path]).unwrap(), 2);
    let pe = c.store.course("PE1").unwrap();
    assert_eq!(pe.abbreviation.as_deref(), Some("PHYSK"));
    assert_eq!(pe.credits.as_deref(), Some("5"));
    assert_eq!(pe.a_to_g, None);
    assert_eq!(c.store.course("ALG").unwrap().abbreviation.as_deref(), Some("ALGE1"));
}

#[test]
fn rejected_roster_rows_leave_no_trace() {
    let fx = Fixture::new();
    let students = fx.students(&[student_row("1", &[])]);
    let rosters = fx.rosters(
        "all",
        &[
            roster_row("1", "50", "AAAA", &[]),
            roster_row("9", "51", "MATH1", &[]),
            roster_row("1", "52", "MATH1", &[("termid", "-2000")]),
            roster_row("1", "53", "MATH1", &[("sectionid", "-501")]),
            roster_row("1", "54", "MATH1", &[("sectionid", "")]),
            roster_row("1", "55", "MATH1", &[("expression", "HR")]),
            roster_row("1", "56", "MATH1", &[("abbreviation", "")]),
            roster_row("1", "57", "MATH1", &[("termid", "")]),
        ],
    );
    let opts = ETLOptions::default();
    let mut c = ctx();
    analyze_students(&mut c, &students, year("10-11"), &opts).unwrap();
    assert_eq!(analyze_rosters(&mut c, &[rosters], &opts).unwrap(), 8);

    assert!(c.store.roster_years().is_empty());
    assert_eq!(c.store.active_teachers(year("10-11")).count(), 0);
    assert!(!c.store.has_student("9"));
    for reason in [
        Reject::ExcludedCourse,
        Reject::UnknownStudent,
        Reject::DroppedTerm,
        Reject::DroppedSection,
        Reject::MissingSection,
        Reject::NoPeriod,
        Reject::NoTerm,
        Reject::MalformedTerm,
    ] {
        assert_eq!(c.tally.count(reason), 1, "{reason:?}");
    }
}

#[test]
fn roster_rows_join_student_teacher_and_enrollment() {
    let fx = Fixture::new();
    let students = fx.students(&[student_row("1", &[("grade_level", "6")])]);
    let teachers = fx.teachers(&[teacher_row("50", &[("status", "2")])]);
    let rosters = fx.rosters(
        "all",
        &[
            roster_row("1", "50", "MATH1", &[("expression", "3rd period"), ("termid", "2001"), ("abbreviation", "HT 2")]),
            roster_row("1", "50", "ART", &[("termid", "-1900"), ("sectionid", "-77")]),
        ],
    );
    let opts = ETLOptions::default().with_negative_ids(NegativeIdPolicy::StripSign);
    let mut c = ctx();
    analyze_teachers(&mut c, &teachers, year("10-11")).unwrap();
    analyze_students(&mut c, &students, year("10-11"), &opts).unwrap();
    analyze_rosters(&mut c, &[rosters], &opts).unwrap();

    assert_eq!(c.store.roster_years(), vec![year("09-10"), year("10-11")]);
    let m = c.store.roster(year("10-11"), "MATH1-1").unwrap();
    assert_eq!(m.ssid.as_deref(), Some("991"));
    assert_eq!(m.student_id.as_deref(), Some("S1"));
    assert_eq!(m.teacher_id.as_deref(), Some("T50"));
    assert_eq!(m.grade_level.as_deref(), Some("6"));
    assert_eq!(m.period, Some(3));
    assert_eq!(m.term.as_deref(), Some("H2"));
    assert_eq!(m.section_id.as_deref(), Some("501"));
    assert!(c.store.is_teacher_active(year("10-11"), "50"));

    let art = c.store.roster(year("09-10"), "ART-1").unwrap();
    assert_eq!(art.section_id.as_deref(), Some("77"));
    assert_eq!(art.grade_level, None);
    assert!(c.store.is_teacher_active(year("09-10"), "50"));
}
