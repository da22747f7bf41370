use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// The grade-partitioned seed roster files expected under `<workspace>/student/`.
const SEED_FILES: [&str; 4] = ["g7.json", "g8.json", "g9.json", "g10.json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    #[default]
    RatherNotSay,
}

impl Gender {
    /// Lenient parse: unknown or missing values fall back to the default.
    pub fn parse(s: &str) -> Gender {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Gender::Male,
            "female" | "f" => Gender::Female,
            _ => Gender::RatherNotSay,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::RatherNotSay => "rather_not_say",
        }
    }
}

/// Compact payload embedded in a student's QR code. Produced by enrollment
/// and consumed unchanged by scan decode; the short keys are the wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrPayload {
    pub n: String,
    pub g: String,
    pub s: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

impl QrPayload {
    pub fn identity(&self) -> String {
        student_identity(&self.g, &self.s, &self.n)
    }
}

/// Durable student key: grade, section, and the name with all whitespace
/// removed. Deterministic, so repeated scans of one physical student always
/// land on the same identity.
pub fn student_identity(grade: &str, section: &str, name: &str) -> String {
    let compact: String = name.split_whitespace().collect();
    format!("{}-{}-{}", grade, section, compact)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// Row id for dynamic students; seed students get a load-order ordinal.
    pub id: Option<i64>,
    pub student_id: String,
    pub name: String,
    pub gender: Gender,
    pub grade: String,
    pub section: String,
    pub lrn: String,
    pub parent_contact: String,
    pub parent_email: String,
    pub qr_data: String,
}

impl Student {
    pub fn qr_payload(&self) -> QrPayload {
        QrPayload {
            n: self.name.clone(),
            g: self.grade.clone(),
            s: self.section.clone(),
            gn: Some(self.gender.as_str().to_string()),
            l: (!self.lrn.is_empty()).then(|| self.lrn.clone()),
            c: (!self.parent_contact.is_empty()).then(|| self.parent_contact.clone()),
            e: (!self.parent_email.is_empty()).then(|| self.parent_email.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    grade: String,
    section: String,
    #[serde(default)]
    students: Vec<SeedEntry>,
}

#[derive(Debug, Deserialize)]
struct SeedEntry {
    name: String,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    lrn: Option<String>,
    #[serde(default)]
    contact: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Immutable roster loaded from the workspace's seed files. The grade and
/// section live on the file, not on each entry.
#[derive(Debug, Default)]
pub struct SeedRoster {
    students: Vec<Student>,
}

impl SeedRoster {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load all seed files. A missing or unparseable file contributes zero
    /// students; the rest of the roster still loads.
    pub fn load(workspace: &Path) -> Self {
        let dir = workspace.join("student");
        let mut students = Vec::new();
        for file in SEED_FILES {
            let path = dir.join(file);
            let content = match std::fs::read_to_string(&path) {
                Ok(c) => c,
                Err(_) => continue,
            };
            let parsed: SeedFile = match serde_json::from_str(&content) {
                Ok(p) => p,
                Err(e) => {
                    warn!(file, error = %e, "skipping unparseable seed roster file");
                    continue;
                }
            };
            for entry in parsed.students {
                let ordinal = students.len() as i64 + 1;
                students.push(seed_student(ordinal, &parsed.grade, &parsed.section, entry));
            }
        }
        Self { students }
    }

    pub fn resolve(&self, student_id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.student_id == student_id)
    }

    pub fn by_grade<'a>(&'a self, grade: &'a str) -> impl Iterator<Item = &'a Student> {
        self.students.iter().filter(move |s| s.grade == grade)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Student> {
        self.students.iter()
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}

fn seed_student(ordinal: i64, grade: &str, section: &str, entry: SeedEntry) -> Student {
    let gender = entry.gender.as_deref().map(Gender::parse).unwrap_or_default();
    let student = Student {
        id: Some(ordinal),
        student_id: student_identity(grade, section, &entry.name),
        name: entry.name,
        gender,
        grade: grade.to_string(),
        section: section.to_string(),
        lrn: entry.lrn.unwrap_or_default(),
        parent_contact: entry.contact.unwrap_or_default(),
        parent_email: entry.email.unwrap_or_default(),
        qr_data: String::new(),
    };
    let qr_data =
        serde_json::to_string(&student.qr_payload()).unwrap_or_else(|_| "{}".to_string());
    Student { qr_data, ..student }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_workspace() -> std::path::PathBuf {
        let p = std::env::temp_dir().join(format!(
            "attendanced-roster-{}",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(p.join("student")).expect("create temp workspace");
        p
    }

    #[test]
    fn identity_is_whitespace_insensitive_and_stable() {
        let a = student_identity("9", "Peace", "  Juan  Dela Cruz ");
        let b = student_identity("9", "Peace", "Juan Dela Cruz");
        assert_eq!(a, b);
        assert_eq!(a, "9-Peace-JuanDelaCruz");
        assert_eq!(a, student_identity("9", "Peace", "Juan Dela Cruz"));
    }

    #[test]
    fn qr_payload_round_trips_to_same_identity() {
        let student = seed_student(
            1,
            "7",
            "Love",
            SeedEntry {
                name: "Dela Cruz, Ana".to_string(),
                gender: Some("female".to_string()),
                lrn: Some("123456789012".to_string()),
                contact: Some("09171234567".to_string()),
                email: None,
            },
        );
        let decoded: QrPayload = serde_json::from_str(&student.qr_data).expect("decode qr");
        assert_eq!(decoded.identity(), student.student_id);
        assert_eq!(decoded.c.as_deref(), Some("09171234567"));
        // Absent optional fields are omitted from the payload entirely.
        assert!(!student.qr_data.contains("\"e\""));
    }

    #[test]
    fn load_skips_broken_files_and_keeps_the_rest() {
        let ws = temp_workspace();
        std::fs::write(
            ws.join("student/g7.json"),
            r#"{"grade":"7","section":"Love","students":[
                {"name":"Dela Cruz, Ana","gender":"female","contact":"09171234567"},
                {"name":"Santos, Ben","contact":"09170000001"}
            ]}"#,
        )
        .unwrap();
        std::fs::write(ws.join("student/g8.json"), "{ not json").unwrap();
        // g9.json / g10.json intentionally absent.

        let roster = SeedRoster::load(&ws);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.by_grade("7").count(), 2);
        assert_eq!(roster.by_grade("8").count(), 0);

        let ana = roster.resolve("7-Love-DelaCruz,Ana").expect("resolve ana");
        assert_eq!(ana.gender, Gender::Female);
        assert_eq!(ana.parent_contact, "09171234567");
        // Unspecified gender defaults.
        let ben = roster.resolve("7-Love-Santos,Ben").expect("resolve ben");
        assert_eq!(ben.gender, Gender::RatherNotSay);
    }

    #[test]
    fn gender_parse_is_lenient() {
        assert_eq!(Gender::parse("Male"), Gender::Male);
        assert_eq!(Gender::parse("F"), Gender::Female);
        assert_eq!(Gender::parse("prefer not"), Gender::RatherNotSay);
    }
}
