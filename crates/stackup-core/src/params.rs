//! Parameter reconciliation
//!
//! Every parameter the deployed template declares gets exactly one directive,
//! in declaration order: the caller's override if there is one, otherwise an
//! instruction to keep the deployed value.

use std::collections::HashMap;

use crate::error::ConfigError;
use crate::reporter::Reporter;
use crate::types::{ParameterDirective, TemplateParameter, REDACTED};

/// Parsed `KEY=VALUE` overrides
///
/// A repeated key keeps its last value; each repeat is reported as a warning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterOverrides {
    values: HashMap<String, String>,
}

impl ParameterOverrides {
    /// Parse override lines.
    ///
    /// Each line is trimmed and split on the first `=`; the value keeps any
    /// further `=`. Lines without `=` or with an empty key are rejected.
    pub fn parse<S: AsRef<str>>(lines: &[S], reporter: &dyn Reporter) -> Result<Self, ConfigError> {
        let mut values = HashMap::with_capacity(lines.len());
        for line in lines {
            let line = line.as_ref().trim();
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::MalformedOverride(line.to_string()));
            };
            if key.is_empty() {
                return Err(ConfigError::MalformedOverride(line.to_string()));
            }
            if values.insert(key.to_string(), value.to_string()).is_some() {
                reporter.warning(&format!(
                    "[Parameter] {key} is overridden more than once, using the last value"
                ));
            }
        }
        Ok(Self { values })
    }

    /// Override for `key`
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Number of distinct keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// No overrides supplied
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One directive per declared parameter, in declaration order.
///
/// Overrides for keys the template does not declare are ignored. Values of
/// `NoEcho` parameters are masked with the reporter and never logged.
pub fn reconcile_parameters(
    template_parameters: &[TemplateParameter],
    overrides: &ParameterOverrides,
    reporter: &dyn Reporter,
) -> Vec<ParameterDirective> {
    template_parameters
        .iter()
        .map(|param| match overrides.get(&param.key) {
            Some(value) => {
                let shown = if param.no_echo {
                    reporter.mask(value);
                    REDACTED
                } else {
                    value
                };
                reporter.info(&format!("[Parameter] {} => UpdateToValue: {shown}", param.key));
                ParameterDirective::Value {
                    key: param.key.clone(),
                    value: value.to_string(),
                }
            }
            None => {
                reporter.info(&format!("[Parameter] {} => UsePreviousValue: true", param.key));
                ParameterDirective::UsePrevious {
                    key: param.key.clone(),
                }
            }
        })
        .collect()
}

/// Parse raw override lines and reconcile them against the template.
pub fn parse_parameters<S: AsRef<str>>(
    template_parameters: &[TemplateParameter],
    parameter_overrides: &[S],
    reporter: &dyn Reporter,
) -> Result<Vec<ParameterDirective>, ConfigError> {
    let overrides = ParameterOverrides::parse(parameter_overrides, reporter)?;
    Ok(reconcile_parameters(template_parameters, &overrides, reporter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::TracingReporter;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn template(keys: &[&str]) -> Vec<TemplateParameter> {
        keys.iter().map(|k| TemplateParameter::new(*k)).collect()
    }

    fn value(key: &str, value: &str) -> ParameterDirective {
        ParameterDirective::Value {
            key: key.into(),
            value: value.into(),
        }
    }

    fn previous(key: &str) -> ParameterDirective {
        ParameterDirective::UsePrevious { key: key.into() }
    }

    #[test]
    fn returns_all_parameters() {
        let parameters = parse_parameters(
            &template(&["UUID", "Name"]),
            &["UUID=0F54400F-937E-46B9-8C4C-5D94833C9FB8", "Name=test"],
            &TracingReporter,
        )
        .unwrap();

        assert_eq!(
            parameters,
            vec![value("UUID", "0F54400F-937E-46B9-8C4C-5D94833C9FB8"), value("Name", "test")]
        );
    }

    #[test]
    fn uses_previous_value_when_not_supplied() {
        let parameters = parse_parameters(
            &template(&["UUID", "Name"]),
            &["UUID=0F54400F-937E-46B9-8C4C-5D94833C9FB8"],
            &TracingReporter,
        )
        .unwrap();

        assert_eq!(
            parameters,
            vec![value("UUID", "0F54400F-937E-46B9-8C4C-5D94833C9FB8"), previous("Name")]
        );
    }

    #[test]
    fn value_keeps_later_equals_signs() {
        let parameters =
            parse_parameters(&template(&["Query"]), &["  Query=a=b==c  "], &TracingReporter).unwrap();
        assert_eq!(parameters, vec![value("Query", "a=b==c")]);
    }

    #[test]
    fn empty_value_is_explicit() {
        let parameters = parse_parameters(&template(&["Name"]), &["Name="], &TracingReporter).unwrap();
        assert_eq!(parameters, vec![value("Name", "")]);
    }

    #[test]
    fn unknown_keys_ignored() {
        let parameters = parse_parameters(&template(&["Name"]), &["Other=1"], &TracingReporter).unwrap();
        assert_eq!(parameters, vec![previous("Name")]);
    }

    #[test]
    fn bare_key_rejected() {
        assert_eq!(
            parse_parameters(&template(&["Name"]), &["Name"], &TracingReporter),
            Err(ConfigError::MalformedOverride("Name".into()))
        );
        assert_eq!(
            parse_parameters(&template(&["Name"]), &["=value"], &TracingReporter),
            Err(ConfigError::MalformedOverride("=value".into()))
        );
    }

    #[test]
    fn last_duplicate_wins() {
        let overrides = ParameterOverrides::parse(&["Name=first", "Name=second"], &TracingReporter).unwrap();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides.get("Name"), Some("second"));
    }

    proptest! {
        #[test]
        fn output_matches_declared_order(
            keys in proptest::collection::vec("[A-Za-z][A-Za-z0-9]{0,8}", 0..12),
            picks in proptest::collection::vec(any::<bool>(), 12),
        ) {
            let declared = template(&keys.iter().map(String::as_str).collect::<Vec<_>>());
            let lines: Vec<String> = keys
                .iter()
                .zip(&picks)
                .filter(|(_, pick)| **pick)
                .map(|(k, _)| format!("{k}=v-{k}"))
                .collect();

            let parameters = parse_parameters(&declared, &lines, &TracingReporter).unwrap();

            prop_assert_eq!(parameters.len(), declared.len());
            for (directive, param) in parameters.iter().zip(&declared) {
                prop_assert_eq!(directive.key(), param.key.as_str());
                let expected = format!("v-{}", param.key);
                if lines.iter().any(|l| l.split_once('=').map(|(k, _)| k) == Some(param.key.as_str())) {
                    prop_assert_eq!(directive.value(), Some(expected.as_str()));
                } else {
                    prop_assert!(directive.uses_previous_value());
                    prop_assert_eq!(directive.value(), None);
                }
            }
        }
    }
}
