//! Render options.
//!
//! Options can be built in code or deserialized from JSON, e.g. a config
//! block embedded in the page:
//!
//! ```json
//! {"selector": "[data-widget-host=\"island\"]", "clean": true, "initialProps": {"a": 1}}
//! ```

use islet_dom::Selector;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{IslandError, Result};
use crate::props::Props;

/// Options for one `Island::render` call. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderOptions {
    /// Selector for host elements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Remove a host's existing children before mounting.
    pub clean: bool,
    /// Replace the host with the widget instead of mounting inside it.
    pub replace: bool,
    /// Mount into the parent of the executing script.
    pub inline: bool,
    /// Lowest-priority props.
    pub initial_props: Props,
    /// Selector for external JSON props scripts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub props_selector: Option<String>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    pub fn with_inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }

    pub fn with_initial_props(mut self, props: Props) -> Self {
        self.initial_props = props;
        self
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.initial_props.insert(key.into(), value.into());
        self
    }

    pub fn with_props_selector(mut self, selector: impl Into<String>) -> Self {
        self.props_selector = Some(selector.into());
        self
    }

    /// Validate and parse selectors.
    pub fn compile(&self) -> Result<CompiledOptions> {
        let mode = match (self.clean, self.replace) {
            (true, true) => return Err(IslandError::ConflictingOptions),
            (true, false) => MountMode::Clean,
            (false, true) => MountMode::Replace,
            (false, false) => MountMode::Append,
        };
        Ok(CompiledOptions {
            selector: compile_selector("selector", self.selector.as_deref())?,
            mode,
            inline: self.inline,
            initial_props: self.initial_props.clone(),
            props_selector: compile_selector("propsSelector", self.props_selector.as_deref())?,
        })
    }
}

fn compile_selector(option: &'static str, source: Option<&str>) -> Result<Option<Selector>> {
    source
        .map(|s| {
            Selector::parse(s).map_err(|source| IslandError::InvalidSelector {
                option,
                selector: s.to_string(),
                source,
            })
        })
        .transpose()
}

/// How a root is attached to its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MountMode {
    /// Append a container, keeping existing children.
    #[default]
    Append,
    /// Remove existing children, then append a container.
    Clean,
    /// Take the host's place.
    Replace,
}

/// Validated options.
#[derive(Debug, Clone)]
pub struct CompiledOptions {
    pub selector: Option<Selector>,
    pub mode: MountMode,
    pub inline: bool,
    pub initial_props: Props,
    pub props_selector: Option<Selector>,
}
