//! Mixin and component tags
//!
//! Mixins are named fragments defined once per template and rendered again
//! wherever they are mixed in:
//!
//! ```text
//! {% mixin badge %}<span class="badge">{{ label }}</span>{% endmixin %}
//! {% mix badge with label="new" %}
//! {% mix badge with label=user.role only %}
//! ```
//!
//! Components render another template in place, replacing the slot
//! placeholders it declares with the slot bodies written inside the tag:
//!
//! ```text
//! {% component "card.html" with title=page.title %}
//!     {% slot body %}{{ page.summary }}{% endslot %}
//! {% endcomponent %}
//! ```

pub(crate) mod component;
pub(crate) mod mixin;
mod options;
mod registry;
pub(crate) mod slots;

pub use component::{resolve_target, ComponentInvocation};
pub use mixin::{MixinDefinition, MixinInvocation};
pub use options::TagOptions;
pub use registry::{MixinError, MixinTable};
pub use slots::{SlotInstance, SlotMark, SlotPlaceholder, SlotRegistry, SLOT_VARIABLE};
