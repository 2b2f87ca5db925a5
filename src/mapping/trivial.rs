use super::Mapping;
use crate::config::MappingSettings;
use crate::query::Member;

/// Mapping that camel-cases member names and pluralizes type names
///
/// `EnergyUse` maps to `energyUse`, a nested `Address.City` to
/// `address.city`, and the type `Robot` to the collection `robots`.
#[derive(Clone, Debug, Default)]
pub struct TrivialMapping {
    settings: MappingSettings,
}

impl TrivialMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: MappingSettings) -> Self {
        Self { settings }
    }

    fn convert(&self, name: &str) -> String {
        if self.settings.camel_case {
            camel_case(name)
        } else {
            name.to_string()
        }
    }
}

impl Mapping for TrivialMapping {
    fn get_field_name(&self, member: &Member) -> String {
        member
            .path
            .iter()
            .map(|segment| self.convert(segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn get_type_name(&self, type_name: &str) -> String {
        let name = self.convert(type_name);
        if self.settings.pluralize_type_names && !name.ends_with('s') {
            format!("{}s", name)
        } else {
            name
        }
    }
}

/// Lower-case the first character
fn camel_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_name_is_camel_cased() {
        let mapping = TrivialMapping::new();
        let member = Member::new("GetFieldNameCamelCasesMemberName");
        assert_eq!(mapping.get_field_name(&member), "getFieldNameCamelCasesMemberName");
    }

    #[test]
    fn test_nested_field_name() {
        let mapping = TrivialMapping::new();
        let member = Member::nested(["Address", "PostCode"]);
        assert_eq!(mapping.get_field_name(&member), "address.postCode");
    }

    #[test]
    fn test_type_name_singular_is_pluralized() {
        let mapping = TrivialMapping::new();
        assert_eq!(mapping.get_type_name("SingularTypeName"), "singularTypeNames");
    }

    #[test]
    fn test_type_name_plural_is_kept() {
        let mapping = TrivialMapping::new();
        assert_eq!(mapping.get_type_name("SingularTypeNames"), "singularTypeNames");
    }

    #[test]
    fn test_settings_disable_conversions() {
        let mapping = TrivialMapping::with_settings(MappingSettings {
            camel_case: false,
            pluralize_type_names: false,
        });
        assert_eq!(mapping.get_field_name(&Member::new("EnergyUse")), "EnergyUse");
        assert_eq!(mapping.get_type_name("Robot"), "Robot");
    }

    #[test]
    fn test_camel_case_edge_cases() {
        assert_eq!(camel_case(""), "");
        assert_eq!(camel_case("x"), "x");
        assert_eq!(camel_case("Éclair"), "éclair");
    }
}
