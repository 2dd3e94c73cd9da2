use valida_core::CategoryId;

pub const DEFAULT_SYLLABUS_URL_PREFIX: &str = "https://www.udima.es";

/// Reference values the checks compare a course against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Expected course start, unix timestamp.
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    /// Categories where validation applies. Empty means every category.
    /// Consulted by callers; the engine itself ignores it.
    pub allowed_categories: Vec<CategoryId>,
    /// Campus base URL used to build edit/view links, without trailing slash.
    pub site_url: String,
    /// Domain every syllabus link must start with.
    pub syllabus_url_prefix: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            allowed_categories: vec![],
            site_url: String::new(),
            syllabus_url_prefix: DEFAULT_SYLLABUS_URL_PREFIX.to_string(),
        }
    }
}

impl ValidationConfig {
    pub fn is_category_allowed(&self, category: CategoryId) -> bool {
        self.allowed_categories.is_empty() || self.allowed_categories.contains(&category)
    }
}
