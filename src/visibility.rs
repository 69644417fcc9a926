use crate::model::{PageNav, Portlet, Post, SocialButton, User, Visibility};

/// The caller identity every query is filtered against.
///
/// Extracted once per request from the session cookie; an anonymous viewer is
/// a valid state, not an error.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
	pub user: Option<User>,
}

impl Viewer {
	pub fn anonymous() -> Self {
		Self::default()
	}

	pub fn authenticated(user: User) -> Self {
		Self { user: Some(user) }
	}

	pub fn is_authenticated(&self) -> bool {
		self.user.is_some()
	}

	pub fn username(&self) -> Option<&str> {
		self.user.as_ref().map(|user| user.username.as_str())
	}
}

/// Anything with a publication state the policy applies to.
///
/// Pages do not implement this directly with a state of their own; their
/// visibility is derived from the bound post's state.
pub trait Restricted {
	fn state(&self) -> Visibility;
}

impl Restricted for Post {
	fn state(&self) -> Visibility {
		self.state
	}
}

impl Restricted for SocialButton {
	fn state(&self) -> Visibility {
		self.state
	}
}

impl Restricted for Portlet {
	fn state(&self) -> Visibility {
		self.state
	}
}

impl Restricted for PageNav {
	fn state(&self) -> Visibility {
		self.post_state
	}
}

/// The single visibility predicate.
///
/// `unrestricted` bypasses the policy entirely (privileged/admin listings);
/// otherwise authenticated viewers see everything and anonymous viewers see
/// only public items. Every entity type goes through this exact function;
/// divergence between entity types is a bug.
pub fn visible<T: Restricted>(item: &T, viewer: &Viewer, unrestricted: bool) -> bool {
	unrestricted || viewer.is_authenticated() || item.state() == Visibility::Public
}
