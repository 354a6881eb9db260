//! Slug generation bound to one record type.
//!
//! `Sluggable` is called explicitly by the persistence layer: `before_save`
//! decides whether a record needs a (new) slug, builds the source text,
//! normalizes and truncates it, and resolves collisions against the store.

use crate::error::{SlugError, SlugResult};
use crate::models::{value_to_text, Conditions, Filters, Record};
use crate::services::slug::{default_replacements, normalize, truncate};
use crate::services::slugger::{build_slugger, Slugger, SluggerSettings};
use crate::services::store::SlugStore;
use crate::services::unique::resolve;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub type ScopeFn = Arc<dyn Fn(&dyn Record) -> Filters + Send + Sync>;
pub type UniqueFn = Arc<dyn Fn(&dyn Record, &str, &str) -> SlugResult<String> + Send + Sync>;

/// Extra filters under which a slug must be unique.
#[derive(Clone)]
pub enum Scope {
    Static(Filters),
    Computed(ScopeFn),
}

impl Scope {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&dyn Record) -> Filters + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    /// Scope that copies the named fields from the record being slugged;
    /// missing fields scope to `null`.
    pub fn fields(fields: Vec<String>) -> Self {
        Self::computed(move |record| {
            fields
                .iter()
                .map(|f| (f.clone(), record.get(f).cloned().unwrap_or(Value::Null)))
                .collect()
        })
    }

    pub fn filters(&self, record: &dyn Record) -> Filters {
        match self {
            Self::Static(filters) => filters.clone(),
            Self::Computed(f) => f(record),
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::Static(Filters::new())
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(filters) => f.debug_tuple("Static").field(filters).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

#[derive(Clone, Default)]
pub enum Uniqueness {
    Disabled,
    #[default]
    Default,
    /// Called with the record, the normalized slug and the separator.
    Custom(UniqueFn),
}

impl Uniqueness {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&dyn Record, &str, &str) -> SlugResult<String> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }
}

impl fmt::Debug for Uniqueness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::Default => f.write_str("Default"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Immutable slug settings for one record type.
#[derive(Debug, Clone)]
pub struct SlugConfig {
    field: String,
    primary_key: String,
    source_fields: Vec<String>,
    separator: String,
    replacements: Vec<(String, String)>,
    max_length: Option<usize>,
    uniqueness: Uniqueness,
    scope: Scope,
    on_update: bool,
    on_dirty: bool,
    slugger: Arc<dyn Slugger>,
}

impl SlugConfig {
    pub fn builder<I, S>(source_fields: I) -> SlugConfigBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SlugConfigBuilder::new(source_fields.into_iter().map(Into::into).collect())
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn source_fields(&self) -> &[String] {
        &self.source_fields
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn replacements(&self) -> &[(String, String)] {
        &self.replacements
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    pub fn uniqueness(&self) -> &Uniqueness {
        &self.uniqueness
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn on_update(&self) -> bool {
        self.on_update
    }

    pub fn on_dirty(&self) -> bool {
        self.on_dirty
    }

    pub fn slugger(&self) -> &dyn Slugger {
        self.slugger.as_ref()
    }
}

enum SluggerChoice {
    Settings(SluggerSettings),
    Instance(Arc<dyn Slugger>),
}

pub struct SlugConfigBuilder {
    field: String,
    primary_key: String,
    source_fields: Vec<String>,
    separator: String,
    replacements: Vec<(String, String)>,
    max_length: Option<usize>,
    uniqueness: Uniqueness,
    scope: Scope,
    on_update: bool,
    on_dirty: bool,
    slugger: SluggerChoice,
}

impl SlugConfigBuilder {
    fn new(source_fields: Vec<String>) -> Self {
        Self {
            field: "slug".to_string(),
            primary_key: "id".to_string(),
            source_fields,
            separator: "-".to_string(),
            replacements: default_replacements(),
            max_length: None,
            uniqueness: Uniqueness::Default,
            scope: Scope::default(),
            on_update: false,
            on_dirty: false,
            slugger: SluggerChoice::Settings(SluggerSettings::default()),
        }
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    pub fn primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Replaces the whole replacement list.
    pub fn replacements(mut self, replacements: Vec<(String, String)>) -> Self {
        self.replacements = replacements;
        self
    }

    pub fn replacement(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.replacements.push((from.into(), to.into()));
        self
    }

    pub fn max_length(mut self, max_length: Option<usize>) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn uniqueness(mut self, uniqueness: Uniqueness) -> Self {
        self.uniqueness = uniqueness;
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn on_update(mut self, on_update: bool) -> Self {
        self.on_update = on_update;
        self
    }

    pub fn on_dirty(mut self, on_dirty: bool) -> Self {
        self.on_dirty = on_dirty;
        self
    }

    pub fn slugger(mut self, settings: SluggerSettings) -> Self {
        self.slugger = SluggerChoice::Settings(settings);
        self
    }

    pub fn slugger_instance(mut self, slugger: Arc<dyn Slugger>) -> Self {
        self.slugger = SluggerChoice::Instance(slugger);
        self
    }

    pub fn build(self) -> SlugResult<SlugConfig> {
        if self.source_fields.is_empty() {
            return Err(SlugError::Configuration(
                "at least one source field is required".to_string(),
            ));
        }
        if self.source_fields.iter().any(|f| f.is_empty()) {
            return Err(SlugError::Configuration(
                "source field names cannot be empty".to_string(),
            ));
        }
        if self.field.is_empty() {
            return Err(SlugError::Configuration(
                "slug field name cannot be empty".to_string(),
            ));
        }
        if self.max_length == Some(0) {
            return Err(SlugError::Configuration(
                "max_length must be greater than 0".to_string(),
            ));
        }

        let slugger = match self.slugger {
            SluggerChoice::Settings(settings) => build_slugger(&settings)?,
            SluggerChoice::Instance(slugger) => slugger,
        };

        Ok(SlugConfig {
            field: self.field,
            primary_key: self.primary_key,
            source_fields: self.source_fields,
            separator: self.separator,
            replacements: self.replacements,
            max_length: self.max_length,
            uniqueness: self.uniqueness,
            scope: self.scope,
            on_update: self.on_update,
            on_dirty: self.on_dirty,
            slugger,
        })
    }

    /// Like `build`, but an unset `max_length` defaults to the declared
    /// width of the slug column.
    pub fn build_with_schema<S: SlugStore + ?Sized>(mut self, store: &S) -> SlugResult<SlugConfig> {
        if self.max_length.is_none() {
            self.max_length = store.column_length(&self.field)?;
        }
        self.build()
    }
}

/// Outcome of the save-time decision for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlugTransition {
    /// Generation does not apply to this save.
    NoOp,
    /// The slug field carried a hand-written value; holds the source text
    /// when planned and the written slug once applied.
    RegenerateFromExplicitValue(String),
    /// The slug is built from the source fields; holds the joined source
    /// text when planned and the written slug once applied.
    RegenerateFromFields(String),
    /// A slug was generated but equals the stored one, so nothing was written.
    Unchanged(String),
}

pub struct Sluggable<S> {
    config: SlugConfig,
    store: S,
}

impl<S: SlugStore> Sluggable<S> {
    pub fn new(config: SlugConfig, store: S) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &SlugConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Normalizes and truncates free text. No uniqueness check is made since
    /// there is no record to scope it to.
    pub fn slug_text(&self, text: &str, separator: Option<&str>) -> String {
        let separator = separator.unwrap_or(&self.config.separator);
        let slug = normalize(
            text,
            separator,
            &self.config.replacements,
            self.config.slugger(),
        );
        truncate(&slug, self.config.max_length)
    }

    /// Generates a unique slug for `record`, from `text` when given and from
    /// the configured source fields otherwise.
    pub fn generate_slug(
        &self,
        record: &dyn Record,
        text: Option<&str>,
        separator: Option<&str>,
    ) -> SlugResult<String> {
        let separator = separator.unwrap_or(&self.config.separator);
        let text = match text {
            Some(text) => text.to_string(),
            None => self.source_text(record, separator)?,
        };

        let slug = self.slug_text(&text, Some(separator));
        if slug.is_empty() {
            return Err(SlugError::InvalidInput(format!(
                "'{}' does not contain any characters usable in a slug",
                text
            )));
        }
        self.unique_slug(record, slug, separator)
    }

    /// Decides what a save should do with the slug field, without touching
    /// the record or the store.
    pub fn plan(&self, record: &dyn Record) -> SlugResult<SlugTransition> {
        let field = self.config.field.as_str();
        let is_new = record.is_new();

        if !is_new && !self.config.on_update {
            return Ok(SlugTransition::NoOp);
        }

        let dirty = record.is_dirty(field);
        let current = record.get(field).and_then(value_to_text);

        if self.config.on_dirty {
            if !dirty && !is_new {
                return Ok(SlugTransition::NoOp);
            }
        } else if dirty && (!is_new || current.is_some()) {
            return Ok(SlugTransition::NoOp);
        }

        if dirty {
            if let Some(explicit) = current {
                return Ok(SlugTransition::RegenerateFromExplicitValue(explicit));
            }
        }

        self.ensure_sources_valid(record)?;
        let Some(parts) = self.gather_parts(record) else {
            return Ok(SlugTransition::NoOp);
        };
        if parts.is_empty() {
            return Ok(SlugTransition::NoOp);
        }

        Ok(SlugTransition::RegenerateFromFields(
            parts.join(self.config.separator.as_str()),
        ))
    }

    /// Save-time hook: plans, generates and writes the slug onto `record`.
    pub fn before_save(&self, record: &mut dyn Record) -> SlugResult<SlugTransition> {
        let (text, from_fields) = match self.plan(record)? {
            SlugTransition::RegenerateFromExplicitValue(text) => (text, false),
            SlugTransition::RegenerateFromFields(text) => (text, true),
            other => return Ok(other),
        };

        let slug = self.generate_slug(record, Some(&text), None)?;
        let field = self.config.field.as_str();

        let current = record.get(field).and_then(value_to_text);
        if current.as_deref() == Some(slug.as_str()) {
            tracing::debug!("Slug '{}' on {} is unchanged", slug, field);
            return Ok(SlugTransition::Unchanged(slug));
        }

        tracing::debug!("Setting {} to '{}'", field, slug);
        record.set(field, Value::String(slug.clone()));
        Ok(if from_fields {
            SlugTransition::RegenerateFromFields(slug)
        } else {
            SlugTransition::RegenerateFromExplicitValue(slug)
        })
    }

    /// Filter selecting the record(s) whose slug equals `slug` within
    /// `scope`.
    pub fn find_by_unique_slug(&self, scope: &Filters, slug: Option<&str>) -> SlugResult<Conditions> {
        let slug = slug.ok_or(SlugError::MissingParameter("slug"))?;
        let mut conditions = Conditions::new().with(self.config.field.clone(), slug);
        conditions.merge_missing(scope);
        Ok(conditions)
    }

    /// Existence filter for `slug`: same scope as `record`, excluding the
    /// record itself once it has a primary key.
    pub fn conditions(&self, record: &dyn Record, slug: &str) -> Conditions {
        let mut conditions = Conditions::new().with(self.config.field.clone(), slug);
        conditions.merge_missing(&self.config.scope.filters(record));

        match record.get(&self.config.primary_key) {
            Some(id) if !id.is_null() => {
                conditions.excluding(self.config.primary_key.clone(), id.clone())
            }
            _ => conditions,
        }
    }

    fn unique_slug(&self, record: &dyn Record, slug: String, separator: &str) -> SlugResult<String> {
        match &self.config.uniqueness {
            Uniqueness::Disabled => Ok(slug),
            Uniqueness::Custom(f) => f(record, &slug, separator),
            Uniqueness::Default => resolve(&slug, separator, self.config.max_length, |candidate| {
                let conditions = self.conditions(record, candidate);
                Ok(self.store.exists(&conditions)?)
            }),
        }
    }

    fn ensure_sources_valid(&self, record: &dyn Record) -> SlugResult<()> {
        match self
            .config
            .source_fields
            .iter()
            .find(|field| record.has_error(field))
        {
            Some(field) => Err(SlugError::InvalidInput(format!(
                "Error while generating the slug, the field `{}` contains an invalid value.",
                field
            ))),
            None => Ok(()),
        }
    }

    /// Source values in configured order. `None` when a source field is
    /// null on an existing record, which makes the update ambiguous.
    fn gather_parts(&self, record: &dyn Record) -> Option<Vec<String>> {
        let mut parts = Vec::with_capacity(self.config.source_fields.len());
        for field in &self.config.source_fields {
            let value = record.get(field);
            if value.map_or(true, Value::is_null) && !record.is_new() {
                return None;
            }
            if let Some(text) = value.and_then(value_to_text) {
                parts.push(text);
            }
        }
        Some(parts)
    }

    fn source_text(&self, record: &dyn Record, separator: &str) -> SlugResult<String> {
        self.ensure_sources_valid(record)?;
        match self.gather_parts(record) {
            Some(parts) if !parts.is_empty() => Ok(parts.join(separator)),
            Some(_) => Err(SlugError::InvalidInput(format!(
                "none of the source fields ({}) has a value",
                self.config.source_fields.join(", ")
            ))),
            None => Err(SlugError::InvalidInput(format!(
                "a source field ({}) is null on an existing record",
                self.config.source_fields.join(", ")
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Entity;
    use crate::services::store::MemoryStore;
    use serde_json::{json, Map};

    fn tags(store: &MemoryStore) -> Sluggable<&MemoryStore> {
        let config = SlugConfig::builder(["name"])
            .build_with_schema(store)
            .unwrap();
        Sluggable::new(config, store)
    }

    /// Mimics the storage layer: assigns an id and records the row.
    fn save(sluggable: &Sluggable<&MemoryStore>, entity: &mut Entity) -> SlugTransition {
        let transition = sluggable.before_save(entity).unwrap();
        let id = entity
            .get("id")
            .cloned()
            .unwrap_or_else(|| json!(sluggable.store().len().unwrap() + 1));
        entity.mark_persisted("id", id);
        sluggable.store().insert(entity.fields().clone()).unwrap();
        transition
    }

    fn persisted(value: Value) -> Entity {
        Entity::persisted(value.as_object().cloned().unwrap_or_default())
    }

    #[test]
    fn test_builder_defaults() {
        let config = SlugConfig::builder(["name"]).build().unwrap();
        assert_eq!(config.field(), "slug");
        assert_eq!(config.primary_key(), "id");
        assert_eq!(config.separator(), "-");
        assert_eq!(config.max_length(), None);
        assert!(!config.on_update());
        assert!(!config.on_dirty());
        assert!(matches!(config.uniqueness(), Uniqueness::Default));
        assert_eq!(config.replacements().len(), 6);
    }

    #[test]
    fn test_builder_rejects_bad_config() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            SlugConfig::builder(empty).build(),
            Err(SlugError::Configuration(_))
        ));
        assert!(matches!(
            SlugConfig::builder(["name"]).max_length(Some(0)).build(),
            Err(SlugError::Configuration(_))
        ));
        assert!(matches!(
            SlugConfig::builder(["name"])
                .slugger(SluggerSettings::named("unknown"))
                .build(),
            Err(SlugError::Configuration(_))
        ));
    }

    #[test]
    fn test_max_length_defaults_from_schema() {
        let store = MemoryStore::new().with_column_length("slug", 255);
        let config = SlugConfig::builder(["name"])
            .build_with_schema(&store)
            .unwrap();
        assert_eq!(config.max_length(), Some(255));

        let config = SlugConfig::builder(["name"])
            .max_length(Some(10))
            .build_with_schema(&store)
            .unwrap();
        assert_eq!(config.max_length(), Some(10));
    }

    #[test]
    fn test_slug_text() {
        let store = MemoryStore::new();
        let sluggable = tags(&store);
        assert_eq!(sluggable.slug_text("foo/bar", None), "foo-bar");
        assert_eq!(sluggable.slug_text("foo/bar", Some("_")), "foo_bar");
        assert_eq!(
            sluggable.slug_text("admad's \"double quote \"", None),
            "admads-double-quote"
        );
    }

    #[test]
    fn test_before_save_sequential_duplicates() {
        let store = MemoryStore::new();
        let sluggable = tags(&store);

        let mut first = Entity::new(json!({"name": "foo"}));
        save(&sluggable, &mut first);
        assert_eq!(first.get_str("slug").as_deref(), Some("foo"));

        let mut second = Entity::new(json!({"name": "foo"}));
        save(&sluggable, &mut second);
        assert_eq!(second.get_str("slug").as_deref(), Some("foo-1"));
    }

    #[test]
    fn test_before_save_on_update() {
        let store = MemoryStore::new();
        let mut tag = Entity::new(json!({"name": "foo"}));
        save(&tags(&store), &mut tag);
        assert_eq!(tag.get_str("slug").as_deref(), Some("foo"));

        tag.set("name", json!("bar"));
        assert_eq!(tags(&store).before_save(&mut tag).unwrap(), SlugTransition::NoOp);
        assert_eq!(tag.get_str("slug").as_deref(), Some("foo"));

        let on_update = Sluggable::new(
            SlugConfig::builder(["name"]).on_update(true).build().unwrap(),
            &store,
        );
        tag.set("name", json!("baz"));
        assert_eq!(
            on_update.before_save(&mut tag).unwrap(),
            SlugTransition::RegenerateFromFields("baz".to_string())
        );
        assert_eq!(tag.get_str("slug").as_deref(), Some("baz"));

        tag.mark_persisted("id", json!(1));
        tag.unset("name");
        tag.set("namespace", json!("foobar"));
        assert_eq!(on_update.before_save(&mut tag).unwrap(), SlugTransition::NoOp);
        assert_eq!(tag.get_str("slug").as_deref(), Some("baz"));
    }

    #[test]
    fn test_before_save_dirty_slug_field() {
        let store = MemoryStore::new();
        let sluggable = tags(&store);

        let mut tag = Entity::new(json!({"name": "foo", "slug": "bar"}));
        assert_eq!(sluggable.before_save(&mut tag).unwrap(), SlugTransition::NoOp);
        assert_eq!(tag.get_str("slug").as_deref(), Some("bar"));

        let mut tag = Entity::new(json!({"name": "baz", "slug": ""}));
        sluggable.before_save(&mut tag).unwrap();
        assert_eq!(tag.get_str("slug").as_deref(), Some("baz"));

        let on_dirty = Sluggable::new(
            SlugConfig::builder(["name"]).on_dirty(true).build().unwrap(),
            &store,
        );
        let mut tag = Entity::new(json!({"name": "I am nice", "slug": "make ME Nice"}));
        assert_eq!(
            on_dirty.before_save(&mut tag).unwrap(),
            SlugTransition::RegenerateFromExplicitValue("make-me-nice".to_string())
        );
        assert_eq!(tag.get_str("slug").as_deref(), Some("make-me-nice"));

        let mut tag = Entity::new(json!({"name": "Fooz", "slug": ""}));
        on_dirty.before_save(&mut tag).unwrap();
        assert_eq!(tag.get_str("slug").as_deref(), Some("fooz"));
    }

    #[test]
    fn test_on_update_and_on_dirty_with_unrelated_change() {
        let store = MemoryStore::new();
        let sluggable = Sluggable::new(
            SlugConfig::builder(["name"])
                .on_update(true)
                .on_dirty(true)
                .build()
                .unwrap(),
            &store,
        );

        let mut tag = Entity::new(json!({"name": "foo", "slug": "bar", "counter": 1}));
        sluggable.before_save(&mut tag).unwrap();
        assert_eq!(tag.get_str("slug").as_deref(), Some("bar"));
        tag.mark_persisted("id", json!(1));

        tag.set("counter", json!(2));
        assert_eq!(sluggable.before_save(&mut tag).unwrap(), SlugTransition::NoOp);
        assert_eq!(tag.get_str("slug").as_deref(), Some("bar"));
    }

    #[test]
    fn test_empty_source_field_skips_generation() {
        let store = MemoryStore::new();
        let sluggable = Sluggable::new(
            SlugConfig::builder(["namespace"]).build().unwrap(),
            &store,
        );
        let mut tag = Entity::new(json!({"name": "foo"}));
        assert_eq!(sluggable.before_save(&mut tag).unwrap(), SlugTransition::NoOp);
        assert_eq!(tag.get("slug"), None);
    }

    #[test]
    fn test_optional_second_source_field() {
        let store = MemoryStore::new();
        let sluggable = Sluggable::new(
            SlugConfig::builder(["title", "sub_title"]).build().unwrap(),
            &store,
        );
        let mut article = Entity::new(json!({"title": "foo", "sub_title": ""}));
        sluggable.before_save(&mut article).unwrap();
        assert_eq!(article.get_str("slug").as_deref(), Some("foo"));
    }

    #[test]
    fn test_related_record_source_field() {
        let store = MemoryStore::new();
        let sluggable = Sluggable::new(
            SlugConfig::builder(["author.name", "title"]).build().unwrap(),
            &store,
        );
        let article = Entity::new(json!({
            "title": "foo",
            "sub_title": "unused",
            "author": {"id": 1, "name": "admad"}
        }));
        assert_eq!(
            sluggable.generate_slug(&article, None, None).unwrap(),
            "admad-foo"
        );
    }

    #[test]
    fn test_custom_slug_field() {
        let store = MemoryStore::new();
        let sluggable = Sluggable::new(
            SlugConfig::builder(["title"]).field("sub_title").build().unwrap(),
            &store,
        );
        let mut article = Entity::new(json!({"title": "foo", "slug": ""}));
        sluggable.before_save(&mut article).unwrap();
        assert_eq!(article.get_str("sub_title").as_deref(), Some("foo"));
    }

    #[test]
    fn test_source_field_errors_fail_fast() {
        let store = MemoryStore::new();
        let sluggable = tags(&store);

        let mut tag = Entity::new(json!({"name": "foo"}));
        tag.set_error("name", "error");
        assert!(matches!(
            sluggable.before_save(&mut tag),
            Err(SlugError::InvalidInput(_))
        ));
        assert_eq!(tag.get("slug"), None);

        assert!(matches!(
            sluggable.generate_slug(&tag, None, None),
            Err(SlugError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_generate_slug_without_values_is_invalid() {
        let store = MemoryStore::new();
        let sluggable = tags(&store);
        let tag = Entity::new(json!({}));
        assert!(matches!(
            sluggable.generate_slug(&tag, None, None),
            Err(SlugError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_generate_slug_rejects_unusable_text() {
        let store = MemoryStore::new();
        let sluggable = tags(&store);
        let tag = Entity::new(json!({"name": "!!!"}));
        assert!(matches!(
            sluggable.generate_slug(&tag, None, None),
            Err(SlugError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_computed_scope() {
        let store = MemoryStore::new();
        let mut existing = Map::new();
        existing.insert("id".into(), json!(1));
        existing.insert("namespace".into(), json!("bar"));
        existing.insert("slug".into(), json!("color"));
        store.insert(existing).unwrap();

        let sluggable = Sluggable::new(
            SlugConfig::builder(["name"])
                .scope(Scope::computed(|record| {
                    let mut filters = Filters::new();
                    filters.insert(
                        "namespace".into(),
                        record.get("namespace").cloned().unwrap_or(Value::Null),
                    );
                    filters
                }))
                .build()
                .unwrap(),
            &store,
        );

        let tag = Entity::new(json!({"namespace": "foo", "name": "Color"}));
        assert_eq!(sluggable.generate_slug(&tag, None, None).unwrap(), "color");

        let tag = Entity::new(json!({"namespace": "bar", "name": "Color"}));
        assert_eq!(sluggable.generate_slug(&tag, None, None).unwrap(), "color-1");
    }

    #[test]
    fn test_conditions_exclude_own_primary_key() {
        let store = MemoryStore::new();
        let sluggable = Sluggable::new(
            SlugConfig::builder(["name"])
                .scope(Scope::fields(vec!["namespace".to_string()]))
                .build()
                .unwrap(),
            &store,
        );

        let tag = persisted(json!({"id": 7, "name": "foo", "namespace": "a"}));
        let conditions = sluggable.conditions(&tag, "foo");
        assert_eq!(conditions.equals.get("slug"), Some(&json!("foo")));
        assert_eq!(conditions.equals.get("namespace"), Some(&json!("a")));
        assert_eq!(conditions.exclude, Some(("id".to_string(), json!(7))));

        let tag = Entity::new(json!({"name": "foo"}));
        let conditions = sluggable.conditions(&tag, "foo");
        assert_eq!(conditions.equals.get("namespace"), Some(&Value::Null));
        assert_eq!(conditions.exclude, None);
    }

    #[test]
    fn test_uniqueness_disabled() {
        let store = MemoryStore::new();
        let mut existing = Map::new();
        existing.insert("slug".into(), json!("foo"));
        store.insert(existing).unwrap();

        let sluggable = Sluggable::new(
            SlugConfig::builder(["name"])
                .uniqueness(Uniqueness::Disabled)
                .build()
                .unwrap(),
            &store,
        );
        let tag = Entity::new(json!({"name": "foo"}));
        assert_eq!(sluggable.generate_slug(&tag, None, None).unwrap(), "foo");
        assert_eq!(store.probes(), 0);
    }

    #[test]
    fn test_custom_uniqueness() {
        let store = MemoryStore::new();
        let sluggable = Sluggable::new(
            SlugConfig::builder(["name"])
                .uniqueness(Uniqueness::custom(|record, slug, separator| {
                    let ns = record
                        .get("namespace")
                        .and_then(value_to_text)
                        .unwrap_or_default();
                    Ok(format!("{}{}{}", ns, separator, slug))
                }))
                .build()
                .unwrap(),
            &store,
        );
        let tag = Entity::new(json!({"name": "Color", "namespace": "paint"}));
        assert_eq!(
            sluggable.generate_slug(&tag, None, None).unwrap(),
            "paint-color"
        );
    }

    #[test]
    fn test_find_by_unique_slug() {
        let store = MemoryStore::new();
        let sluggable = tags(&store);

        let conditions = sluggable
            .find_by_unique_slug(&Filters::new(), Some("dark-color"))
            .unwrap();
        assert_eq!(conditions.equals.get("slug"), Some(&json!("dark-color")));

        let conditions = sluggable.find_by_unique_slug(&Filters::new(), Some("0")).unwrap();
        assert_eq!(conditions.equals.get("slug"), Some(&json!("0")));

        assert!(matches!(
            sluggable.find_by_unique_slug(&Filters::new(), None),
            Err(SlugError::MissingParameter("slug"))
        ));
    }

    #[test]
    fn test_storage_error_is_not_swallowed() {
        struct Broken;
        impl SlugStore for Broken {
            fn exists(&self, _conditions: &Conditions) -> anyhow::Result<bool> {
                anyhow::bail!("disk I/O error")
            }
        }

        let sluggable = Sluggable::new(SlugConfig::builder(["name"]).build().unwrap(), Broken);
        let tag = Entity::new(json!({"name": "foo"}));
        match sluggable.generate_slug(&tag, None, None) {
            Err(SlugError::Storage(e)) => assert_eq!(e.to_string(), "disk I/O error"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
