//! Migration target extraction
//!
//! Infers which database objects a batch of migration scripts touches, and
//! what final action applies to each, by scanning the script text for DDL
//! statement headers and `sp_rename` calls.
//!
//! This is a lexical scan, not a parser: comments and string literals are not
//! understood, so a DDL header quoted inside a literal or a comment is still
//! reported. The scan sits behind [`TargetExtractor`] so a real parser can
//! replace it without touching reconciliation or scripting.
//!
//! ## Recognized statements
//!
//! ```sql
//! CREATE TABLE [dbo].[Orders] (...)
//! CREATE OR ALTER PROCEDURE dbo.GetOrders ...
//! ALTER VIEW Sales.OpenOrders ...
//! DROP FUNCTION IF EXISTS [dbo].[fnTotal]
//! EXEC sp_rename 'dbo.Orders', 'SalesOrders'
//! EXEC sp_rename 'dbo.Orders.Total', 'GrandTotal', 'COLUMN'
//! ```

mod reconcile;

pub use reconcile::reconcile;

use std::sync::LazyLock;

use rayon::prelude::*;
use regex::{Captures, Regex};

use crate::model::{ObjectAction, ObjectIdentity, ObjectType, SqlScript, DEFAULT_SCHEMA};
use crate::util::contains_ci;

/// Identifier token: a bracketed name or a plain word. Plain words may not
/// start with `#`, so temp tables never match.
const IDENT: &str = r"(?:\[[^\]]+\]|[\p{L}_][\w@$#]*)";

static DDL_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        concat!(
            r"(?im)\b(?P<action>CREATE\s+OR\s+ALTER|CREATE|ALTER|DROP)\s+",
            r"(?P<type>TABLE|VIEW|PROCEDURE|PROC|FUNCTION|SYNONYM|TYPE|TRIGGER)\s+",
            r"(?:IF\s+EXISTS\s+)?",
            r"(?P<first>{ident})(?:\s*\.\s*(?P<second>{ident}))?(?:\s*\.\s*(?P<third>{ident}))?"
        ),
        ident = IDENT
    ))
    .unwrap()
});

static RENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\bsp_rename\s+(?:@objname\s*=\s*)?N?'(?P<schema>[^'.]+)(?:\.(?P<name>[^']+))?'",
        r"\s*,\s*(?:@newname\s*=\s*)?N?'(?P<new>[^']+)'",
        r"(?:\s*,\s*(?:@objtype\s*=\s*)?N?'(?P<objtype>\w+)')?"
    ))
    .unwrap()
});

/// One target found in a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOccurrence {
    /// A CREATE / ALTER / DROP statement header
    Statement(ObjectIdentity),
    /// An `sp_rename` of a whole object. The statement does not say what kind
    /// of object it renames, so `old` and `new` both carry `Undefined` until
    /// [`resolve_occurrences`] probes the catalog.
    Rename {
        old: ObjectIdentity,
        new: ObjectIdentity,
    },
}

/// Source of migration targets for a single script's text
pub trait TargetExtractor: Sync {
    /// Targets in the order they appear in `script`
    fn extract<'a>(&'a self, script: &'a str) -> impl Iterator<Item = TargetOccurrence> + 'a;
}

/// Regex-driven [`TargetExtractor`]
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexTargetExtractor;

impl RegexTargetExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TargetExtractor for RegexTargetExtractor {
    fn extract<'a>(&'a self, script: &'a str) -> impl Iterator<Item = TargetOccurrence> + 'a {
        let mut found: Vec<(usize, TargetOccurrence)> = DDL_HEADER_RE
            .captures_iter(script)
            .map(|caps| (caps.get(0).map_or(0, |m| m.start()), ddl_occurrence(&caps)))
            .collect();

        if contains_ci(script, "sp_rename") {
            found.extend(RENAME_RE.captures_iter(script).filter_map(|caps| {
                let start = caps.get(0).map_or(0, |m| m.start());
                rename_occurrence(&caps).map(|occurrence| (start, occurrence))
            }));
            found.sort_by_key(|(start, _)| *start);
        }

        found.into_iter().map(|(_, occurrence)| occurrence)
    }
}

/// Strip `[` and `]` from a captured identifier
fn strip_brackets(token: &str) -> String {
    token.trim().replace(['[', ']'], "")
}

fn ddl_occurrence(caps: &Captures) -> TargetOccurrence {
    let action = ObjectAction::from_verb(&caps["action"]);
    let object_type = ObjectType::from_keyword(&caps["type"]);

    let parts: Vec<String> = ["first", "second", "third"]
        .iter()
        .filter_map(|group| caps.name(group))
        .map(|m| strip_brackets(m.as_str()))
        .collect();

    // The last part is the object name and the one before it the schema; a
    // leading database qualifier on three-part names is ignored.
    let (schema, name) = match parts.as_slice() {
        [name] => (DEFAULT_SCHEMA.to_string(), name.clone()),
        [.., schema, name] => (schema.clone(), name.clone()),
        [] => (DEFAULT_SCHEMA.to_string(), String::new()),
    };

    TargetOccurrence::Statement(ObjectIdentity::new(schema, name, object_type, action))
}

fn rename_occurrence(caps: &Captures) -> Option<TargetOccurrence> {
    let first = strip_brackets(&caps["schema"]);
    let rest = caps.name("name").map(|m| strip_brackets(m.as_str()));
    let new_name = strip_brackets(&caps["new"]);

    match caps.name("objtype").map(|m| m.as_str().to_ascii_uppercase()) {
        Some(objtype) if matches!(objtype.as_str(), "COLUMN" | "INDEX" | "STATISTICS") => {
            // Renaming a member changes its parent's definition: re-script the parent
            let parts: Vec<String> = std::iter::once(first.as_str())
                .chain(rest.as_deref())
                .flat_map(|p| p.split('.'))
                .map(str::to_string)
                .collect();
            let (schema, parent) = match parts.as_slice() {
                [parent, _member] => (DEFAULT_SCHEMA.to_string(), parent.clone()),
                [.., schema, parent, _member] => (schema.clone(), parent.clone()),
                _ => return None,
            };
            Some(TargetOccurrence::Statement(ObjectIdentity::create(
                &schema,
                &parent,
                ObjectType::Undefined,
            )))
        }
        Some(objtype) if objtype == "DATABASE" => None,
        _ => {
            // An unqualified old name lands in the schema group
            let (schema, old_name) = match rest {
                Some(name) => (first, name),
                None => (DEFAULT_SCHEMA.to_string(), first),
            };
            Some(TargetOccurrence::Rename {
                old: ObjectIdentity::drop(&schema, &old_name, ObjectType::Undefined),
                new: ObjectIdentity::create(&schema, &new_name, ObjectType::Undefined),
            })
        }
    }
}

/// Minimum number of scripts to benefit from parallel scanning.
const PARALLEL_THRESHOLD: usize = 8;

/// Extract targets from many scripts, preserving script order and the order
/// of targets within each script
pub fn extract_targets<E: TargetExtractor>(
    extractor: &E,
    scripts: &[SqlScript],
) -> Vec<TargetOccurrence> {
    let per_script: Vec<Vec<TargetOccurrence>> = if scripts.len() >= PARALLEL_THRESHOLD {
        scripts
            .par_iter()
            .map(|script| extractor.extract(&script.contents).collect())
            .collect()
    } else {
        scripts
            .iter()
            .map(|script| extractor.extract(&script.contents).collect())
            .collect()
    };

    for (script, occurrences) in scripts.iter().zip(&per_script) {
        tracing::debug!(
            script = %script.name,
            targets = occurrences.len(),
            "Extracted migration targets"
        );
    }

    per_script.into_iter().flatten().collect()
}

/// Flatten occurrences into identities, resolving the shared type of each
/// rename pair with `resolve_type(schema, new_name)`.
///
/// The new name is probed because by the time the migration has run only the
/// new name exists in the catalog.
pub fn resolve_occurrences<F>(occurrences: Vec<TargetOccurrence>, mut resolve_type: F) -> Vec<ObjectIdentity>
where
    F: FnMut(&str, &str) -> ObjectType,
{
    let mut identities = Vec::with_capacity(occurrences.len());
    for occurrence in occurrences {
        match occurrence {
            TargetOccurrence::Statement(identity) => identities.push(identity),
            TargetOccurrence::Rename { old, new } => {
                let object_type = resolve_type(&new.schema, &new.name);
                identities.push(old.with_type(object_type));
                identities.push(new.with_type(object_type));
            }
        }
    }
    identities
}
