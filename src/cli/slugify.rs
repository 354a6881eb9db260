use crate::services::sluggable::{SlugConfig, Sluggable, Uniqueness};
use crate::services::slugger::SluggerSettings;
use crate::services::store::MemoryStore;
use anyhow::Result;

pub fn run(
    text: &str,
    separator: &str,
    slugger: &str,
    max_length: Option<usize>,
    keep_case: bool,
) -> Result<()> {
    let config = SlugConfig::builder(["text"])
        .separator(separator)
        .max_length(max_length)
        .uniqueness(Uniqueness::Disabled)
        .slugger(SluggerSettings {
            lowercase: !keep_case,
            ..SluggerSettings::named(slugger)
        })
        .build()?;
    let sluggable = Sluggable::new(config, MemoryStore::new());

    println!("{}", sluggable.slug_text(text, None));
    Ok(())
}
