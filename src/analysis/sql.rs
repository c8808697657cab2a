//! SQL statement classifier.
//!
//! Labels a statement with its type, complexity, and category, and collects
//! review suggestions and the Firebird features it relies on. Classification
//! is a pure function of the text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Prefix carried by the most severe suggestions.
pub const CRITICAL_MARKER: &str = "🚨 WARNING";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementType {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Alter,
    Drop,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Intermediate,
    Complex,
    Dangerous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Query,
    Modification,
    Ddl,
}

/// Result of classifying one SQL statement.
///
/// `suggestions` is ordered by severity, worst first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    #[serde(rename = "type")]
    pub statement_type: StatementType,
    pub complexity: Complexity,
    pub category: Category,
    pub suggestions: Vec<String>,
    pub engine_features: Vec<String>,
    pub performance_tips: Vec<String>,
}

impl Classification {
    fn new(statement_type: StatementType, category: Category) -> Self {
        Self {
            statement_type,
            complexity: Complexity::Simple,
            category,
            suggestions: Vec::new(),
            engine_features: Vec::new(),
            performance_tips: Vec::new(),
        }
    }

    fn suggest(&mut self, items: &[&str]) {
        self.suggestions.extend(items.iter().map(|s| s.to_string()));
    }

    fn tip(&mut self, items: &[&str]) {
        self.performance_tips.extend(items.iter().map(|s| s.to_string()));
    }

    fn feature(&mut self, name: &str) {
        if !self.engine_features.iter().any(|f| f == name) {
            self.engine_features.push(name.to_string());
        }
    }
}

/// All patterns are compile-time constants run against upper-cased text.
fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("Invalid regex: classifier pattern")
}

static SELECT_COMPLEX: Lazy<Regex> = Lazy::new(|| {
    pattern(r"\b(JOIN|UNION|WITH|WINDOW|OVER|PARTITION|HAVING)\b|\bGROUP\s+BY\b")
});
static SELECT_AGGREGATION: Lazy<Regex> =
    Lazy::new(|| pattern(r"\b(COUNT|SUM|AVG|MIN|MAX)\b|\bGROUP\s+BY\b"));
static CTE: Lazy<Regex> = Lazy::new(|| pattern(r"\bWITH\b"));
static WINDOW: Lazy<Regex> = Lazy::new(|| pattern(r"\b(WINDOW|OVER)\b"));
static MERGE: Lazy<Regex> = Lazy::new(|| pattern(r"\bMERGE\b"));
static GLOBAL_TEMPORARY: Lazy<Regex> = Lazy::new(|| pattern(r"\bGLOBAL\s+TEMPORARY\b"));
static INSERT_BATCH: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?s)VALUES\s*\([^)]*\)\s*,|\bINSERT\s+INTO\b.*\bSELECT\b"));
static RETURNING: Lazy<Regex> = Lazy::new(|| pattern(r"\bRETURNING\b"));
static UPDATE_COMPLEX: Lazy<Regex> =
    Lazy::new(|| pattern(r"\bJOIN\b|\(\s*SELECT\b|\bCASE\s+WHEN\b"));
static WHERE: Lazy<Regex> = Lazy::new(|| pattern(r"\bWHERE\b"));
static INDEX: Lazy<Regex> = Lazy::new(|| pattern(r"\bINDEX\b"));
static PROCEDURAL: Lazy<Regex> = Lazy::new(|| pattern(r"\b(PROCEDURE|TRIGGER)\b"));

/// Classify a SQL statement by its leading keyword.
pub fn classify(sql: &str) -> Classification {
    let upper = sql.trim().to_uppercase();
    let keyword = upper
        .split(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .next()
        .unwrap_or_default();

    match keyword {
        "SELECT" => classify_select(&upper),
        "INSERT" => classify_insert(&upper),
        "UPDATE" => classify_update(&upper),
        "DELETE" => classify_delete(&upper),
        "CREATE" => classify_create(&upper),
        "ALTER" => {
            let mut result = Classification::new(StatementType::Alter, Category::Ddl);
            result.suggest(&["Schema changes may require exclusive access"]);
            result
        }
        "DROP" => {
            let mut result = Classification::new(StatementType::Drop, Category::Ddl);
            result.complexity = Complexity::Dangerous;
            result.suggest(&[
                "⚠️  Destructive operation - verify before execution",
                "Consider backup before dropping objects",
            ]);
            result
        }
        _ => Classification::new(StatementType::Unknown, Category::Query),
    }
}

fn classify_select(sql: &str) -> Classification {
    let mut result = Classification::new(StatementType::Select, Category::Query);

    if SELECT_COMPLEX.is_match(sql) {
        result.complexity = Complexity::Complex;
        result.suggest(&[
            "Consider using PLAN to verify optimal execution",
            "Check if all JOIN conditions use indexed columns",
        ]);
        result.tip(&["Use SET PLAN ON to analyze execution plan"]);

        if CTE.is_match(sql) {
            result.feature("Common Table Expression");
        }
        if WINDOW.is_match(sql) {
            result.feature("Window Functions");
        }
    } else if SELECT_AGGREGATION.is_match(sql) {
        result.complexity = Complexity::Intermediate;
        result.suggest(&[
            "Check index usage for GROUP BY columns",
            "Consider partial indexes for filtered aggregations",
        ]);
        result.tip(&["Ensure GROUP BY columns are indexed"]);
    }

    if MERGE.is_match(sql) {
        result.feature("MERGE statement");
    }
    if GLOBAL_TEMPORARY.is_match(sql) {
        result.feature("Global Temporary Tables");
    }

    result
}

fn classify_insert(sql: &str) -> Classification {
    let mut result = Classification::new(StatementType::Insert, Category::Modification);

    if INSERT_BATCH.is_match(sql) {
        result.complexity = Complexity::Intermediate;
        result.suggest(&[
            "Consider transaction size for batch operations",
            "Use MERGE or UPDATE OR INSERT for upsert operations when appropriate",
        ]);
        result.tip(&[
            "Batch inserts in appropriately sized transactions",
            "Consider disabling triggers temporarily for large batches",
        ]);
    }

    if RETURNING.is_match(sql) {
        result.feature("RETURNING clause");
    }

    result
}

fn classify_update(sql: &str) -> Classification {
    let mut result = Classification::new(StatementType::Update, Category::Modification);

    if UPDATE_COMPLEX.is_match(sql) {
        result.complexity = Complexity::Complex;
        result.suggest(&["Verify WHERE clause uses indexed columns"]);
        result.tip(&["Use selective WHERE conditions to minimize row scans"]);
    } else {
        result.suggest(&["Verify WHERE clause is selective and uses indexed columns"]);
    }

    if RETURNING.is_match(sql) {
        result.feature("RETURNING clause");
    }

    result
}

fn classify_delete(sql: &str) -> Classification {
    let mut result = Classification::new(StatementType::Delete, Category::Modification);
    result.suggest(&[
        "⚠️  Always verify WHERE clause before execution",
        "Consider using transaction for safety",
    ]);
    result.tip(&[
        "Use selective WHERE conditions",
        "Consider batch deletion for large datasets",
    ]);

    if !WHERE.is_match(sql) {
        result.complexity = Complexity::Dangerous;
        result.suggestions.insert(
            0,
            format!("{CRITICAL_MARKER}: DELETE without WHERE clause affects ALL rows!"),
        );
    }

    result
}

fn classify_create(sql: &str) -> Classification {
    let mut result = Classification::new(StatementType::Create, Category::Ddl);

    if INDEX.is_match(sql) {
        result.tip(&[
            "Consider partial indexes for selective conditions",
            "Use expression indexes for computed values",
        ]);
    }
    if PROCEDURAL.is_match(sql) {
        result.feature("PSQL (Procedural SQL)");
    }

    result
}

/// Engine-wide advice appended to every optimization list.
const GENERAL_TIPS: [&str; 3] = [
    "Keep transactions short to avoid garbage collection issues",
    "Use prepared statements to reduce parsing overhead",
    "Monitor MON$ tables for performance analysis",
];

const SELECT_TIPS: [&str; 3] = [
    "Use FIRST/SKIP for pagination instead of LIMIT/OFFSET",
    "Consider using EXISTS instead of IN for subqueries",
    "Use UNION ALL instead of UNION when duplicates are acceptable",
];

/// Optimization advice for a statement.
///
/// Order is fixed: type-specific tips, general engine tips, then the
/// performance tips gathered during classification. Callers may truncate.
pub fn optimization_suggestions(sql: &str) -> Vec<String> {
    let classification = classify(sql);
    let mut suggestions = Vec::new();

    if classification.statement_type == StatementType::Select {
        suggestions.extend(SELECT_TIPS.iter().map(|s| s.to_string()));
    }
    suggestions.extend(GENERAL_TIPS.iter().map(|s| s.to_string()));
    suggestions.extend(classification.performance_tips);

    suggestions
}
