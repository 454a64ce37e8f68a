// SSH Tunnel Launcher - Launcher Output Document
// JSON document consumed by the launcher host

use std::collections::BTreeMap;

use serde::Serialize;

/// Variables are kept sorted so identical state prints identical output
pub type Variables = BTreeMap<String, String>;

/// Top-level document printed once per invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: Variables,
    pub items: Vec<Item>,
}

/// One selectable entry
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Item {
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subtitle: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub arg: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: Variables,
    pub icon: Icon,
    pub autocomplete: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(skip_serializing_if = "Modifiers::is_empty")]
    pub mods: Modifiers,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Icon {
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub icon_type: String,
    pub path: String,
}

/// Behaviour while a modifier key is held
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Modifier {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subtitle: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub arg: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: Variables,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKey {
    /// Option / alt
    Alt,
    /// Command
    Cmd,
    Ctrl,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Modifiers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<Modifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Modifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctrl: Option<Modifier>,
}

impl Modifiers {
    pub fn is_empty(&self) -> bool {
        self.alt.is_none() && self.cmd.is_none() && self.ctrl.is_none()
    }

    pub fn get(&self, key: ModifierKey) -> Option<&Modifier> {
        match key {
            ModifierKey::Alt => self.alt.as_ref(),
            ModifierKey::Cmd => self.cmd.as_ref(),
            ModifierKey::Ctrl => self.ctrl.as_ref(),
        }
    }

    fn slot(&mut self, key: ModifierKey) -> &mut Option<Modifier> {
        match key {
            ModifierKey::Alt => &mut self.alt,
            ModifierKey::Cmd => &mut self.cmd,
            ModifierKey::Ctrl => &mut self.ctrl,
        }
    }
}

impl Item {
    /// A non-executable item
    pub fn new(
        title: impl Into<String>,
        subtitle: impl Into<String>,
        autocomplete: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            autocomplete: autocomplete.into(),
            ..Default::default()
        }
    }

    pub fn icon(mut self, path: impl Into<String>) -> Self {
        self.icon = Icon {
            icon_type: String::new(),
            path: path.into(),
        };
        self
    }

    /// Make the item run `arg` when selected
    pub fn executable(mut self, arg: impl Into<String>) -> Self {
        self.arg = arg.into();
        self.valid = true;
        self
    }

    /// Attach `arg` with an explicit validity
    pub fn with_arg(mut self, arg: impl Into<String>, valid: bool) -> Self {
        self.arg = arg.into();
        self.valid = valid;
        self
    }

    pub fn variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn modifier(
        mut self,
        key: ModifierKey,
        subtitle: impl Into<String>,
        arg: impl Into<String>,
        valid: bool,
    ) -> Self {
        *self.mods.slot(key) = Some(Modifier {
            subtitle: subtitle.into(),
            arg: arg.into(),
            valid,
            variables: Variables::new(),
        });
        self
    }
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    pub fn add_items(&mut self, items: impl IntoIterator<Item = Item>) {
        self.items.extend(items);
    }

    /// Document made of a single error entry
    pub fn error(message: impl Into<String>) -> Self {
        let mut response = Self::new();
        response.add_items([Item::new("error", message, "")]);
        response
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
