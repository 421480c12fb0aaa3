//! Cell rendering contract.
//!
//! The engine never draws anything. Each column carries a renderer that
//! turns a [`CellContext`] into a [`CellDisplay`], a small description the
//! host maps onto its own widgets. Row action descriptors are forwarded to
//! the host as menu items and their callbacks are invoked untouched.

use crate::preview::PreviewFormatter;
use crate::value::{Record, Value};
use std::fmt;
use std::rc::Rc;

/// Everything a renderer may look at for one cell.
#[derive(Debug, Clone, Copy)]
pub struct CellContext<'a> {
    pub row_id: &'a str,
    pub row_index: usize,
    pub column_id: &'a str,
    pub value: &'a Value,
    pub record: &'a Record,
    pub selected: bool,
    pub formatter: &'a PreviewFormatter,
}

/// What a cell shows.
#[derive(Debug, Clone, PartialEq)]
pub enum CellDisplay {
    Empty,
    Text(String),
    Badge(StatusBadge),
    Date(String),
    Checkbox { checked: bool },
    Actions(Vec<MenuItem>),
}

impl CellDisplay {
    /// Plain text of the cell, as a screen reader or a text export would see it.
    pub fn text(&self) -> String {
        match self {
            CellDisplay::Empty | CellDisplay::Checkbox { .. } | CellDisplay::Actions(_) => String::new(),
            CellDisplay::Text(s) | CellDisplay::Date(s) => s.clone(),
            CellDisplay::Badge(badge) => badge.label.clone(),
        }
    }
}

pub type CellRenderer = Rc<dyn Fn(&CellContext<'_>) -> CellDisplay>;

/// Wraps a closure as a [`CellRenderer`].
pub fn renderer<F>(f: F) -> CellRenderer
where
    F: Fn(&CellContext<'_>) -> CellDisplay + 'static,
{
    Rc::new(f)
}

/// The preview of the cell, or nothing for blank values.
pub fn render_text(ctx: &CellContext<'_>) -> CellDisplay {
    let text = ctx.formatter.preview(ctx.value);
    if text.trim().is_empty() {
        CellDisplay::Empty
    } else {
        CellDisplay::Text(text)
    }
}

/// Locale date for parsable values; other values fall back to text.
pub fn render_date(ctx: &CellContext<'_>) -> CellDisplay {
    match ctx.value.to_date() {
        Some(date) if !matches!(ctx.value, Value::Int(_) | Value::Float(_)) => {
            CellDisplay::Date(ctx.formatter.format_date(&date))
        }
        _ => render_text(ctx),
    }
}

pub fn render_status(ctx: &CellContext<'_>) -> CellDisplay {
    match ctx.value.as_str().and_then(StatusBadge::from_status) {
        Some(badge) => CellDisplay::Badge(badge),
        None => render_text(ctx),
    }
}

/// Default renderer for a data field: `status` and `created_at` get their
/// dedicated renderers, everything else renders as text.
pub fn default_renderer(field: &str) -> CellRenderer {
    match field {
        "status" => renderer(render_status),
        "created_at" => renderer(render_date),
        _ => renderer(render_text),
    }
}

const KNOWN_STATUSES: &[&str] = &[
    "NOT_STARTED",
    "OPEN",
    "IN_PROGRESS_IMPLEMENTER",
    "IN_PROGRESS_OWNER",
    "CLOSED_NOT_VERIFIED",
    "CLOSED_VERIFIED_BY_RISK",
    "CLOSED_RISK_NA",
    "CLOSED_RISK_ACCEPTED",
    "CLOSED_VERIFIED_BY_AUDIT",
    "STARTED",
    "ONGOING",
    "ARCHIVED",
    "COMPLETED",
    "FAILED",
    "PENDING",
    "DRAFT",
    "PREPARED",
    "REVIEWED",
];

/// A normalized workflow status.
///
/// # Examples
///
/// ```
/// use smarttable::StatusBadge;
///
/// let badge = StatusBadge::from_status("In Progress -> Implementer").unwrap();
/// assert_eq!(badge.key, "IN_PROGRESS_IMPLEMENTER");
/// assert_eq!(badge.label, "In Progress→Implementer");
/// assert!(badge.known);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBadge {
    /// Upper-case key, e.g. `IN_PROGRESS_OWNER`.
    pub key: String,
    /// Display label, e.g. `In Progress Owner`.
    pub label: String,
    /// Whether the key is one of the recognised statuses.
    pub known: bool,
}

impl StatusBadge {
    /// None for blank input.
    pub fn from_status(status: &str) -> Option<Self> {
        if status.trim().is_empty() {
            return None;
        }
        let key = normalize_status_key(status);
        Some(StatusBadge {
            known: KNOWN_STATUSES.contains(&key.as_str()),
            label: format_status_label(status),
            key,
        })
    }
}

fn normalize_status_key(status: &str) -> String {
    let arrows = replace_arrows(status.trim(), "_");
    arrows
        .to_uppercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .replace('-', "_")
}

fn format_status_label(status: &str) -> String {
    let text = replace_arrows(status, "→").replace('_', " ").to_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if at_word_start && c.is_alphanumeric() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !c.is_alphanumeric();
    }
    out
}

/// Replaces `->` together with the whitespace around it.
fn replace_arrows(text: &str, with: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("->") {
        out.push_str(rest[..pos].trim_end());
        out.push_str(with);
        rest = rest[pos + 2..].trim_start();
    }
    out.push_str(rest);
    out
}

pub type ActionHandler = Rc<dyn Fn(&Record)>;

/// One built-in row action (view, edit or delete).
#[derive(Clone)]
pub struct RowAction {
    pub on_click: ActionHandler,
    pub visible: Option<bool>,
    pub disabled: Option<bool>,
    pub icon: Option<String>,
    pub tooltip: Option<String>,
}

impl RowAction {
    pub fn new<F>(on_click: F) -> Self
    where
        F: Fn(&Record) + 'static,
    {
        RowAction {
            on_click: Rc::new(on_click),
            visible: None,
            disabled: None,
            icon: None,
            tooltip: None,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = Some(false);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }
}

impl fmt::Debug for RowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowAction")
            .field("visible", &self.visible)
            .field("disabled", &self.disabled)
            .field("icon", &self.icon)
            .field("tooltip", &self.tooltip)
            .finish_non_exhaustive()
    }
}

/// A host-defined action computed per row.
#[derive(Clone)]
pub struct ExtraAction {
    pub label: String,
    pub action: RowAction,
    pub destructive: bool,
}

impl fmt::Debug for ExtraAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtraAction")
            .field("label", &self.label)
            .field("action", &self.action)
            .field("destructive", &self.destructive)
            .finish()
    }
}

pub type ExtrasFn = Rc<dyn Fn(&Record) -> Vec<ExtraAction>>;

/// Which action a menu item triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    View,
    Edit,
    Delete,
    Extra(String),
}

/// One entry of a row's action menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub kind: ActionKind,
    pub label: String,
    pub disabled: bool,
    pub destructive: bool,
    pub icon: Option<String>,
    /// Only reported for disabled items.
    pub tooltip: Option<String>,
    pub separator_before: bool,
}

/// Row action descriptors for the trailing actions column.
#[derive(Clone, Default)]
pub struct RowActions {
    pub view: Option<RowAction>,
    pub edit: Option<RowAction>,
    pub delete: Option<RowAction>,
    pub extras: Option<ExtrasFn>,
}

impl fmt::Debug for RowActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowActions")
            .field("view", &self.view)
            .field("edit", &self.edit)
            .field("delete", &self.delete)
            .field("extras", &self.extras.is_some())
            .finish()
    }
}

impl RowActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_view(mut self, action: RowAction) -> Self {
        self.view = Some(action);
        self
    }

    pub fn with_edit(mut self, action: RowAction) -> Self {
        self.edit = Some(action);
        self
    }

    pub fn with_delete(mut self, action: RowAction) -> Self {
        self.delete = Some(action);
        self
    }

    pub fn with_extras<F>(mut self, extras: F) -> Self
    where
        F: Fn(&Record) -> Vec<ExtraAction> + 'static,
    {
        self.extras = Some(Rc::new(extras));
        self
    }

    /// Menu entries for one row, built-ins first.
    pub fn menu(&self, record: &Record) -> Vec<MenuItem> {
        let mut items = Vec::new();
        let builtins = [
            (ActionKind::View, "View", &self.view),
            (ActionKind::Edit, "Edit", &self.edit),
            (ActionKind::Delete, "Delete", &self.delete),
        ];
        for (kind, label, action) in builtins {
            let Some(action) = action.as_ref().filter(|a| a.visible != Some(false)) else {
                continue;
            };
            let destructive = kind == ActionKind::Delete;
            items.push(menu_item(kind, label, action, destructive, destructive));
        }
        for extra in self.extras(record) {
            if extra.action.visible == Some(false) {
                continue;
            }
            items.push(menu_item(
                ActionKind::Extra(extra.label.clone()),
                &extra.label,
                &extra.action,
                extra.destructive,
                false,
            ));
        }
        items
    }

    /// Runs the action behind `kind` for `record`. Disabled, hidden and
    /// unknown actions do nothing; the return value says whether a handler ran.
    pub fn invoke(&self, kind: &ActionKind, record: &Record) -> bool {
        let extras;
        let action = match kind {
            ActionKind::View => self.view.as_ref(),
            ActionKind::Edit => self.edit.as_ref(),
            ActionKind::Delete => self.delete.as_ref(),
            ActionKind::Extra(label) => {
                extras = self.extras(record);
                extras.iter().find(|e| &e.label == label).map(|e| &e.action)
            }
        };
        match action {
            Some(a) if a.visible != Some(false) && a.disabled != Some(true) => {
                (a.on_click)(record);
                true
            }
            _ => false,
        }
    }

    fn extras(&self, record: &Record) -> Vec<ExtraAction> {
        self.extras.as_ref().map(|f| f(record)).unwrap_or_default()
    }
}

fn menu_item(kind: ActionKind, label: &str, action: &RowAction, destructive: bool, separator_before: bool) -> MenuItem {
    let disabled = action.disabled.unwrap_or(false);
    MenuItem {
        kind,
        label: label.to_string(),
        disabled,
        destructive,
        icon: action.icon.clone(),
        tooltip: action.tooltip.clone().filter(|_| disabled),
        separator_before,
    }
}
