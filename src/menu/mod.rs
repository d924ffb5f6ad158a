pub mod filter;
pub mod icons;
pub mod pipelines;
pub mod pulls;

use chrono::{DateTime, FixedOffset, Utc};
use std::fmt;

use crate::action::{token, ActionRequest};
use crate::bitbucket::types::Account;

pub const SEPARATOR: &str = "---";
pub const REPO_COLOR: &str = "#D0D0D0";
pub const OWN_COLOR: &str = "#3A855D";
pub const OTHER_COLOR: &str = "#09F4F7FB";

/// Stand-in for `|` inside entry text, where a real pipe would start the
/// attribute list.
const PIPE_SUBSTITUTE: char = '｜';

/// Display color of a pipeline or step state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateColor {
    Pending,
    Progress,
    Success,
    Failed,
}

impl StateColor {
    /// Total over state names: anything unrecognised is a failure.
    pub fn for_state(state: &str) -> StateColor {
        match state {
            "PENDING" => StateColor::Pending,
            "IN_PROGRESS" => StateColor::Progress,
            "COMPLETED" => StateColor::Success,
            _ => StateColor::Failed,
        }
    }

    pub fn hex(&self) -> &'static str {
        match self {
            StateColor::Pending => "#7E8BA7",
            StateColor::Progress => "#2A63F6",
            StateColor::Success => "#3A855D",
            StateColor::Failed => "#CD4425",
        }
    }
}

/// One line of menu output: nesting depth, text, then `key=value` attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    depth: usize,
    text: String,
    attrs: Vec<(&'static str, String)>,
}

impl MenuItem {
    pub fn new(text: impl AsRef<str>) -> Self {
        Self::nested(0, text)
    }

    pub fn nested(depth: usize, text: impl AsRef<str>) -> Self {
        Self {
            depth,
            text: text.as_ref().replace('|', &PIPE_SUBSTITUTE.to_string()),
            attrs: Vec::new(),
        }
    }

    fn attr(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((key, value.into()));
        self
    }

    pub fn color(self, color: &str) -> Self {
        self.attr("color", color)
    }

    pub fn href(self, url: impl Into<String>) -> Self {
        self.attr("href", url)
    }

    pub fn size(self, size: u32) -> Self {
        self.attr("size", size.to_string())
    }

    pub fn refresh(self) -> Self {
        self.attr("refresh", "true")
    }

    pub fn image(self, png_base64: &str) -> Self {
        self.attr("image", png_base64)
    }

    pub fn template_image(self, png_base64: &str) -> Self {
        self.attr("templateImage", png_base64)
    }

    /// Run `<program> action <token>` in a terminal when clicked.
    pub fn action(self, program: &str, request: &ActionRequest) -> Self {
        self.attr("shell", format!("\"{program}\""))
            .attr("param1", "action")
            .attr("param2", token::encode(request))
            .attr("terminal", "true")
    }
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", "--".repeat(self.depth), self.text)?;
        for (i, (key, value)) in self.attrs.iter().enumerate() {
            let sep = if i == 0 && self.text.is_empty() { "| " } else { " | " };
            write!(f, "{sep}{key}={value}")?;
        }
        Ok(())
    }
}

/// Ordered menu output.
#[derive(Debug, Default)]
pub struct Menu {
    lines: Vec<String>,
}

impl Menu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: MenuItem) {
        self.lines.push(item.to_string());
    }

    pub fn separator(&mut self) {
        self.lines.push(SEPARATOR.to_string());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn print(&self) {
        for line in self.lines() {
            println!("{line}");
        }
    }
}

/// Everything a render pass needs besides the polled data.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub workspace: String,
    pub web_url: String,
    /// Own nickname, for highlighting self-authored items.
    pub nickname: Option<String>,
    pub offset: FixedOffset,
    /// Path of this binary, bound to action lines.
    pub program: String,
    pub now: DateTime<Utc>,
}

impl RenderContext {
    pub fn repo_url(&self, repo: &str) -> String {
        format!("{}/{}/{}", self.web_url, self.workspace, repo)
    }

    pub fn timestamp(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset)
            .format("%Y/%m/%d %H:%M:%S")
            .to_string()
    }

    pub fn author_color(&self, author: Option<&Account>) -> &'static str {
        match (author.and_then(|a| a.nickname.as_deref()), self.nickname.as_deref()) {
            (Some(theirs), Some(mine)) if theirs == mine => OWN_COLOR,
            _ => OTHER_COLOR,
        }
    }
}

pub fn account_name(account: Option<&Account>) -> &str {
    account
        .and_then(|a| a.nickname.as_deref().or(a.display_name.as_deref()))
        .unwrap_or("-")
}

/// Shared title block: a title entry, a separator, and a refresh entry.
pub fn header(menu: &mut Menu, title: MenuItem) {
    menu.push(title);
    menu.separator();
    menu.push(MenuItem::new("Refresh").refresh());
}

/// What a menu shows before the plugin is configured; the caller adds the prompt.
pub fn setup(title: MenuItem) -> Menu {
    let mut menu = Menu::new();
    header(&mut menu, title);
    menu
}
