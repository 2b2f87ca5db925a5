//! Search context
//!
//! The `SearchContext` binds settings and a mapping so queries can be
//! composed and translated without passing them around.

use crate::config::QuerySettings;
use crate::error::Result;
use crate::mapping::{Mapping, TrivialMapping};
use crate::query::{translate, Document, Query, Translation};
use crate::response::Materializer;

/// Settings plus the mapping used to resolve names
#[derive(Debug)]
pub struct SearchContext {
    settings: QuerySettings,
    mapping: Box<dyn Mapping>,
}

impl SearchContext {
    /// Context with the default mapping configured by `settings`
    pub fn new(settings: QuerySettings) -> Result<Self> {
        settings.validate()?;
        let mapping = TrivialMapping::with_settings(settings.mapping.clone());
        Ok(Self {
            settings,
            mapping: Box::new(mapping),
        })
    }

    /// Replace the mapping
    pub fn with_mapping(mut self, mapping: impl Mapping + 'static) -> Self {
        self.mapping = Box::new(mapping);
        self
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    pub fn mapping(&self) -> &dyn Mapping {
        &*self.mapping
    }

    /// Start a query over all documents of `T`
    pub fn query<T: Document>(&self) -> Query {
        Query::from::<T>()
    }

    /// Translate `query` with this context's mapping and prefix
    ///
    /// Hit-list requests without an explicit size get the configured
    /// default size.
    pub fn translate(&self, query: &Query) -> Result<Translation> {
        let mut translation = translate(
            &*self.mapping,
            &self.settings.field_prefix,
            query.expression(),
        )?;

        if let (Materializer::ListHits(_), None) =
            (&translation.materializer, translation.search_request.size)
        {
            translation.search_request.size = self.settings.default_size;
        }
        Ok(translation)
    }

    /// Search endpoint for a translated request
    pub fn search_path(&self, translation: &Translation) -> String {
        translation
            .search_request
            .search_path(self.settings.index.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MappingSettings;
    use crate::query::{field, Member};

    struct Robot;

    impl Document for Robot {
        fn type_name() -> &'static str {
            "Robot"
        }
    }

    #[derive(Debug)]
    struct UpperMapping;

    impl Mapping for UpperMapping {
        fn get_field_name(&self, member: &Member) -> String {
            member.path.join(".").to_uppercase()
        }

        fn get_type_name(&self, type_name: &str) -> String {
            type_name.to_uppercase()
        }
    }

    #[test]
    fn test_default_size_applies_to_hit_lists_only() {
        let context = SearchContext::new(QuerySettings::default().with_default_size(25)).unwrap();

        let list = context.translate(&context.query::<Robot>()).unwrap();
        assert_eq!(list.search_request.size, Some(25));

        let paged = context.translate(&context.query::<Robot>().take(3)).unwrap();
        assert_eq!(paged.search_request.size, Some(3));

        let count = context.translate(&context.query::<Robot>().count()).unwrap();
        assert_eq!(count.search_request.size, Some(0));
    }

    #[test]
    fn test_prefix_and_mapping_settings() {
        let settings = QuerySettings {
            field_prefix: "doc".to_string(),
            mapping: MappingSettings {
                camel_case: false,
                pluralize_type_names: false,
            },
            ..Default::default()
        };
        let context = SearchContext::new(settings.with_index("fleet")).unwrap();

        let translation = context
            .translate(&context.query::<Robot>().filter(field("Zone").is_not_null()))
            .unwrap();
        assert_eq!(translation.search_request.doc_type, "Robot");
        assert_eq!(
            translation.search_request.filter,
            Some(crate::request::Criteria::exists("doc.Zone"))
        );
        assert_eq!(context.search_path(&translation), "/fleet/Robot/_search");
    }

    #[test]
    fn test_custom_mapping() {
        let context = SearchContext::new(QuerySettings::default())
            .unwrap()
            .with_mapping(UpperMapping);

        let translation = context
            .translate(&context.query::<Robot>().order_by(field("Name")))
            .unwrap();
        assert_eq!(translation.search_request.doc_type, "ROBOT");
        assert_eq!(translation.search_request.sort_fields[0].field, "NAME");
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = QuerySettings::default().with_field_prefix(".bad");
        assert!(SearchContext::new(settings).is_err());
    }
}
