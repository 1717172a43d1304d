use std::collections::HashMap;

use derive_more::From;
use serde::{Deserialize, Serialize};

use crate::config::Environment;

/// Type alias for a map of custom attributes.
pub type Attributes = HashMap<String, AttributeValue>;

/// Enum representing possible values of a user attribute.
///
/// Conveniently implements `From` conversions for `String`, `&str`, `f64`, and `bool` types.
///
/// ```
/// # use featuregate::AttributeValue;
/// let string_attr: AttributeValue = "example".into();
/// let number_attr: AttributeValue = 42.0.into();
/// let bool_attr: AttributeValue = true.into();
/// ```
#[derive(Debug, Serialize, Deserialize, PartialEq, PartialOrd, From, Clone)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A string value.
    String(String),
    /// A numerical value.
    Number(f64),
    /// A boolean value.
    Boolean(bool),
    /// A null value or absence of value.
    Null,
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

/// The user a gate or config is evaluated for.
///
/// `user_id` is required: evaluating a user without one is rejected with
/// [`Error::MissingUserId`](crate::Error::MissingUserId).
///
/// `private_attributes` participate in evaluation but are stripped before an exposure is
/// recorded, so they never leave the process except in the remote evaluation request itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct User {
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom: Attributes,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub private_attributes: Attributes,
    /// Environment descriptor (`tier` plus arbitrary parameters).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, String>,
}

impl User {
    /// Create a user with the given id and no attributes.
    ///
    /// ```
    /// # use featuregate::User;
    /// let user = User::new("user-42").with_email("a@example.com").with_custom("plan", "pro");
    /// ```
    pub fn new(user_id: impl Into<String>) -> User {
        User {
            user_id: user_id.into(),
            ..User::default()
        }
    }

    #[allow(missing_docs)]
    pub fn with_email(mut self, email: impl Into<String>) -> User {
        self.email = Some(email.into());
        self
    }

    #[allow(missing_docs)]
    pub fn with_ip(mut self, ip: impl Into<String>) -> User {
        self.ip = Some(ip.into());
        self
    }

    #[allow(missing_docs)]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> User {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[allow(missing_docs)]
    pub fn with_country(mut self, country: impl Into<String>) -> User {
        self.country = Some(country.into());
        self
    }

    #[allow(missing_docs)]
    pub fn with_locale(mut self, locale: impl Into<String>) -> User {
        self.locale = Some(locale.into());
        self
    }

    #[allow(missing_docs)]
    pub fn with_app_version(mut self, app_version: impl Into<String>) -> User {
        self.app_version = Some(app_version.into());
        self
    }

    /// Add a custom attribute.
    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> User {
        self.custom.insert(key.into(), value.into());
        self
    }

    /// Add a private attribute. Private attributes are never included in exposure events.
    pub fn with_private_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> User {
        self.private_attributes.insert(key.into(), value.into());
        self
    }

    /// Set a user-level environment parameter. User-level values win over the client-wide
    /// [`Environment`].
    pub fn with_environment(mut self, key: impl Into<String>, value: impl Into<String>) -> User {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Return a copy of the user with the client-wide environment merged in.
    ///
    /// Precedence, lowest first: `environment.params`, `environment.tier` (as `"tier"`), the
    /// user's own environment entries.
    pub(crate) fn normalized(&self, environment: &Environment) -> User {
        let mut merged = environment.params.clone();
        if let Some(tier) = &environment.tier {
            merged.insert("tier".to_owned(), tier.clone());
        }
        merged.extend(
            self.environment
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        User {
            environment: merged,
            ..self.clone()
        }
    }

    /// Return a copy of the user that is safe to put into an exposure event.
    pub(crate) fn without_private_attributes(&self) -> User {
        User {
            private_attributes: Attributes::new(),
            ..self.clone()
        }
    }

    /// Look up a user field by name.
    ///
    /// Well-known fields are matched case-insensitively (`userID`, `user_id`, `email`, ...), then
    /// custom attributes, then private attributes.
    pub(crate) fn get_field(&self, field: &str) -> Option<AttributeValue> {
        let known = match field.to_ascii_lowercase().as_str() {
            "userid" | "user_id" => Some(self.user_id.as_str()),
            "email" => self.email.as_deref(),
            "ip" => self.ip.as_deref(),
            "useragent" | "user_agent" => self.user_agent.as_deref(),
            "country" => self.country.as_deref(),
            "locale" => self.locale.as_deref(),
            "appversion" | "app_version" => self.app_version.as_deref(),
            _ => None,
        };
        if let Some(value) = known {
            return Some(value.into());
        }

        self.custom
            .get(field)
            .or_else(|| self.private_attributes.get(field))
            .filter(|value| **value != AttributeValue::Null)
            .cloned()
    }

    pub(crate) fn get_environment_field(&self, field: &str) -> Option<AttributeValue> {
        self.environment
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(field))
            .map(|(_, value)| value.as_str().into())
    }
}
