//! Role prompt sources.

use crate::topic::Role;
use std::path::Path;
use tracing::warn;

/// The two role prompts, loaded once per process and immutable afterwards.
///
/// A missing source yields an empty role prompt rather than an error;
/// completion calls still proceed, just without role framing.
#[derive(Debug, Clone, Default)]
pub struct RolePrompts {
    pub student: String,
    pub teacher: String,
}

impl RolePrompts {
    /// Reads `student.md` and `teacher.md` from the prompts directory.
    pub fn load(dir: &Path) -> Self {
        Self {
            student: read_role(dir, "student"),
            teacher: read_role(dir, "teacher"),
        }
    }

    pub fn for_role(&self, role: Role) -> &str {
        match role {
            Role::Student => &self.student,
            Role::Teacher => &self.teacher,
        }
    }
}

fn read_role(dir: &Path, name: &str) -> String {
    let path = dir.join(format!("{name}.md"));
    match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path.display(), %err, "role prompt source missing, using empty prompt");
            String::new()
        }
    }
}
