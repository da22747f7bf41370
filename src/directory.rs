use crate::roster::{Gender, SeedRoster, Student};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};
use std::collections::HashSet;

// Two-tier student directory: the immutable seed roster shadows the dynamic
// SQLite table. Resolution and listing both apply seed-first precedence, so
// a dynamic row can never mask a seed entry with the same identity.

fn row_to_student(row: &Row) -> rusqlite::Result<Student> {
    Ok(Student {
        id: Some(row.get(0)?),
        student_id: row.get(1)?,
        name: row.get(2)?,
        gender: Gender::parse(&row.get::<_, String>(3)?),
        grade: row.get(4)?,
        section: row.get(5)?,
        lrn: row.get(6)?,
        parent_contact: row.get(7)?,
        parent_email: row.get(8)?,
        qr_data: row.get(9)?,
    })
}

const STUDENT_COLS: &str =
    "id, student_id, name, gender, grade, section, lrn, parent_contact, parent_email, qr_data";

pub fn resolve(
    seed: &SeedRoster,
    conn: &Connection,
    student_id: &str,
) -> anyhow::Result<Option<Student>> {
    if let Some(s) = seed.resolve(student_id) {
        return Ok(Some(s.clone()));
    }
    let sql = format!("SELECT {STUDENT_COLS} FROM students WHERE student_id = ?");
    Ok(conn
        .query_row(&sql, [student_id], row_to_student)
        .optional()?)
}

/// Insert or overwrite a dynamic student. Identity is the conflict key; the
/// seed roster is never written.
pub fn upsert(conn: &Connection, student: &Student) -> anyhow::Result<Student> {
    conn.execute(
        "INSERT INTO students(student_id, name, gender, grade, section, lrn,
                              parent_contact, parent_email, qr_data, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(student_id) DO UPDATE SET
           name = excluded.name,
           gender = excluded.gender,
           grade = excluded.grade,
           section = excluded.section,
           lrn = excluded.lrn,
           parent_contact = excluded.parent_contact,
           parent_email = excluded.parent_email,
           qr_data = excluded.qr_data",
        (
            &student.student_id,
            &student.name,
            student.gender.as_str(),
            &student.grade,
            &student.section,
            &student.lrn,
            &student.parent_contact,
            &student.parent_email,
            &student.qr_data,
            Utc::now().to_rfc3339(),
        ),
    )?;
    let sql = format!("SELECT {STUDENT_COLS} FROM students WHERE student_id = ?");
    Ok(conn.query_row(&sql, [&student.student_id], row_to_student)?)
}

pub fn list_by_grade(
    seed: &SeedRoster,
    conn: &Connection,
    grade: &str,
) -> anyhow::Result<Vec<Student>> {
    let mut out: Vec<Student> = seed.by_grade(grade).cloned().collect();
    let seen: HashSet<String> = out.iter().map(|s| s.student_id.clone()).collect();
    let sql = format!("SELECT {STUDENT_COLS} FROM students WHERE grade = ? ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let dynamic = stmt
        .query_map([grade], row_to_student)?
        .collect::<Result<Vec<_>, _>>()?;
    out.extend(dynamic.into_iter().filter(|s| !seen.contains(&s.student_id)));
    Ok(out)
}

pub fn list_all(seed: &SeedRoster, conn: &Connection) -> anyhow::Result<Vec<Student>> {
    let mut out: Vec<Student> = seed.iter().cloned().collect();
    let seen: HashSet<String> = out.iter().map(|s| s.student_id.clone()).collect();
    let sql = format!("SELECT {STUDENT_COLS} FROM students ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let dynamic = stmt
        .query_map([], row_to_student)?
        .collect::<Result<Vec<_>, _>>()?;
    out.extend(dynamic.into_iter().filter(|s| !seen.contains(&s.student_id)));
    Ok(out)
}

pub fn clear_dynamic(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("DELETE FROM students", [])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::roster::student_identity;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        db::init_schema(&conn).expect("init schema");
        conn
    }

    fn seed_with(entries: &[(&str, &str, &str, &str)]) -> SeedRoster {
        // (grade, section, name, contact) via the JSON loader to keep one
        // construction path.
        use std::time::{SystemTime, UNIX_EPOCH};
        let ws = std::env::temp_dir().join(format!(
            "attendanced-dir-{}",
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos()
        ));
        std::fs::create_dir_all(ws.join("student")).unwrap();
        let mut by_file: std::collections::HashMap<&str, Vec<serde_json::Value>> =
            Default::default();
        for (grade, section, name, contact) in entries {
            let file = match *grade {
                "7" => "g7.json",
                "8" => "g8.json",
                "9" => "g9.json",
                _ => "g10.json",
            };
            by_file.entry(file).or_default().push(serde_json::json!({
                "name": name, "contact": contact, "section": section, "grade": grade,
            }));
        }
        for (file, students) in by_file {
            let (grade, section) = (
                students[0]["grade"].as_str().unwrap().to_string(),
                students[0]["section"].as_str().unwrap().to_string(),
            );
            let body = serde_json::json!({
                "grade": grade, "section": section, "students": students,
            });
            std::fs::write(ws.join("student").join(file), body.to_string()).unwrap();
        }
        SeedRoster::load(&ws)
    }

    fn dynamic_student(grade: &str, section: &str, name: &str, contact: &str) -> Student {
        Student {
            id: None,
            student_id: student_identity(grade, section, name),
            name: name.to_string(),
            gender: Gender::RatherNotSay,
            grade: grade.to_string(),
            section: section.to_string(),
            lrn: String::new(),
            parent_contact: contact.to_string(),
            parent_email: String::new(),
            qr_data: "{}".to_string(),
        }
    }

    #[test]
    fn seed_entry_shadows_dynamic_row_with_same_identity() {
        let seed = seed_with(&[("9", "Peace", "Juan Dela Cruz", "09171234567")]);
        let conn = test_conn();
        upsert(&conn, &dynamic_student("9", "Peace", "Juan Dela Cruz", "09999999999")).unwrap();

        let id = student_identity("9", "Peace", "Juan Dela Cruz");
        let resolved = resolve(&seed, &conn, &id).unwrap().expect("resolve");
        assert_eq!(resolved.parent_contact, "09171234567");

        let listed = list_by_grade(&seed, &conn, "9").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].parent_contact, "09171234567");
    }

    #[test]
    fn dynamic_only_students_appear_after_seed_in_listings() {
        let seed = seed_with(&[("8", "Joy", "Reyes, Carla", "09170000002")]);
        let conn = test_conn();
        upsert(&conn, &dynamic_student("8", "Joy", "New Student", "09180000000")).unwrap();

        let listed = list_by_grade(&seed, &conn, "8").unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Reyes, Carla");
        assert_eq!(listed[1].name, "New Student");
        assert_eq!(list_all(&seed, &conn).unwrap().len(), 2);
    }

    #[test]
    fn upsert_overwrites_mutable_fields_and_keeps_row_id() {
        let seed = SeedRoster::empty();
        let conn = test_conn();
        let first = upsert(&conn, &dynamic_student("8", "Joy", "New Student", "09180000000"))
            .unwrap();
        let mut changed = dynamic_student("8", "Joy", "New Student", "09181111111");
        changed.parent_email = "parent@example.com".to_string();
        let second = upsert(&conn, &changed).unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.parent_contact, "09181111111");
        assert_eq!(second.parent_email, "parent@example.com");
        assert_eq!(list_all(&seed, &conn).unwrap().len(), 1);
    }

    #[test]
    fn resolve_misses_cleanly() {
        let seed = SeedRoster::empty();
        let conn = test_conn();
        assert!(resolve(&seed, &conn, "7-Love-Nobody").unwrap().is_none());
    }
}
