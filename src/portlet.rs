use std::collections::BTreeMap;

use crate::model::Portlet;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// Rendering was requested for a kind nobody registered. This is a
	/// programming error (a row can only carry a registered kind), not a
	/// condition the request path recovers from.
	#[error("portlet kind `{0}` is not registered")]
	UnknownKind(String),
	#[error("text portlet has no body")]
	MissingBody,
}

/// The rendering capability every portlet variant must provide.
///
/// There is no instantiable "base portlet": the trait *is* the base
/// contract, so a kind without behaviour cannot exist at the type level.
pub trait Render: Send + Sync {
	/// The lowercase kind tag this renderer claims.
	fn kind(&self) -> &'static str;

	/// Checks candidate field values before a row of this kind is
	/// persisted, so a row that cannot render is never stored. The default
	/// accepts anything.
	fn validate(&self, body: Option<&str>) -> Result<(), Error> {
		let _ = body;
		Ok(())
	}

	/// Produces the rendered HTML fragment for one portlet row.
	fn render(&self, portlet: &Portlet) -> Result<String, Error>;
}

const TEXT_TEMPLATE: &str = "<div class=\"portlet portlet-text\">\
	<h3 class=\"portlet-title\">{title}</h3>\
	<div class=\"portlet-body\">{body}</div>\
</div>";

/// The built-in variant: a required body rendered by plain template
/// substitution.
pub struct TextPortlet;

impl Render for TextPortlet {
	fn kind(&self) -> &'static str {
		"text"
	}

	fn validate(&self, body: Option<&str>) -> Result<(), Error> {
		body.map(|_| ()).ok_or(Error::MissingBody)
	}

	fn render(&self, portlet: &Portlet) -> Result<String, Error> {
		let body = portlet.body.as_deref().ok_or(Error::MissingBody)?;

		Ok(TEXT_TEMPLATE
			.replace("{title}", &portlet.title)
			.replace("{body}", body))
	}
}

/// The portlet variant registry.
///
/// One instance is built at startup, seeded with the built-in [`TextPortlet`]
/// before any query runs, and owned read-only by the content service for the
/// lifetime of the process. Registration during live traffic is unsupported.
pub struct Registry {
	renderers: BTreeMap<&'static str, Box<dyn Render>>,
}

impl Registry {
	pub fn new() -> Self {
		let mut registry = Self {
			renderers: BTreeMap::new(),
		};

		registry.register(Box::new(TextPortlet));
		registry
	}

	/// Registers a variant. Registering an already-known kind is a no-op,
	/// keeping the first renderer.
	pub fn register(&mut self, renderer: Box<dyn Render>) {
		self.renderers.entry(renderer.kind()).or_insert(renderer);
	}

	/// The registered kind tags, in deterministic order.
	pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
		self.renderers.keys().copied()
	}

	pub fn contains(&self, kind: &str) -> bool {
		self.renderers.contains_key(kind)
	}

	/// Runs the matching renderer's pre-persistence check.
	pub fn validate(&self, kind: &str, body: Option<&str>) -> Result<(), Error> {
		self.renderers
			.get(kind)
			.ok_or_else(|| Error::UnknownKind(kind.to_string()))?
			.validate(body)
	}

	/// Dispatches to the renderer matching the portlet's kind tag.
	pub fn render(&self, portlet: &Portlet) -> Result<String, Error> {
		self.renderers
			.get(portlet.kind.as_str())
			.ok_or_else(|| Error::UnknownKind(portlet.kind.clone()))?
			.render(portlet)
	}
}

impl Default for Registry {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::model::Visibility;

	fn portlet(kind: &str, body: Option<&str>) -> Portlet {
		Portlet {
			id: 1,
			kind: kind.into(),
			state: Visibility::Public,
			title: "Hello".into(),
			order: 1,
			slot_id: None,
			body: body.map(Into::into),
		}
	}

	struct Custom;

	impl Render for Custom {
		fn kind(&self) -> &'static str {
			"custom"
		}

		fn render(&self, portlet: &Portlet) -> Result<String, Error> {
			Ok(format!("custom:{}", portlet.title))
		}
	}

	#[test]
	fn seeded_with_text() {
		let registry = Registry::new();

		assert!(registry.contains("text"));
		assert_eq!(registry.kinds().collect::<Vec<_>>(), vec!["text"]);
	}

	#[test]
	fn register_is_idempotent() {
		let mut registry = Registry::new();

		registry.register(Box::new(Custom));
		registry.register(Box::new(Custom));

		assert_eq!(registry.kinds().collect::<Vec<_>>(), vec!["custom", "text"]);
	}

	#[test]
	fn text_renders_by_substitution() {
		let registry = Registry::new();
		let html = registry.render(&portlet("text", Some("<p>body</p>"))).unwrap();

		assert!(html.contains("<p>body</p>"));
		assert!(html.contains("Hello"));
	}

	#[test]
	fn text_without_body_fails() {
		let registry = Registry::new();

		assert!(matches!(
			registry.render(&portlet("text", None)),
			Err(Error::MissingBody)
		));
	}

	#[test]
	fn validate_requires_a_body_for_text() {
		let registry = Registry::new();

		assert!(registry.validate("text", Some("body")).is_ok());
		assert!(matches!(
			registry.validate("text", None),
			Err(Error::MissingBody)
		));
		assert!(matches!(
			registry.validate("marquee", None),
			Err(Error::UnknownKind(kind)) if kind == "marquee"
		));
	}

	#[test]
	fn unknown_kind_fails() {
		let registry = Registry::new();

		assert!(matches!(
			registry.render(&portlet("marquee", None)),
			Err(Error::UnknownKind(kind)) if kind == "marquee"
		));
	}
}
