//! Keymaps and user requests.
//!
//! A request is a user intent; the dispatcher in the binary turns it into an
//! operation on the current view. Key lookup is layered: the current view's
//! keymap first, then the shared `Generic` keymap, then the compiled-in
//! default table. User bindings from the config file are prepended to their
//! keymap, so a rebind shadows without removing.
//!
//! The default table is scanned in declaration order and the first match
//! wins. That policy is observable: `b` appears twice below, so `b` opens
//! the blob view and page-up keeps its other aliases.

use core_text::enum_name_eq;

/// User action requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    // View switching; order matches the view table in the binary.
    ViewMain,
    ViewDiff,
    ViewLog,
    ViewTree,
    ViewBlob,
    ViewHelp,
    ViewPager,

    // View manipulation
    Enter,
    Next,
    Previous,
    ViewNext,
    ViewClose,
    Quit,

    // Cursor navigation
    MoveUp,
    MoveDown,
    MovePageDown,
    MovePageUp,
    MoveFirstLine,
    MoveLastLine,

    // Scrolling
    ScrollLineUp,
    ScrollLineDown,
    ScrollPageUp,
    ScrollPageDown,

    // Searching
    Search,
    SearchBack,
    FindNext,
    FindPrev,

    // Misc
    None,
    Prompt,
    ScreenRedraw,
    ScreenResize,
    ShowVersion,
    StopLoading,
    ToggleLineno,
    ToggleRevGraph,
}

/// One row of the request catalog: either a group caption (`request` is
/// `None`) or a bindable request with its config name and help text.
pub struct RequestInfo {
    pub request: Option<Request>,
    pub name: &'static str,
    pub help: &'static str,
}

macro_rules! req {
    ($request:ident, $name:literal, $help:literal) => {
        RequestInfo {
            request: Some(Request::$request),
            name: $name,
            help: $help,
        }
    };
}

macro_rules! req_group {
    ($caption:literal) => {
        RequestInfo {
            request: None,
            name: "",
            help: $caption,
        }
    };
}

/// Catalog of every request, in help-screen order. Also the source of truth
/// for `bind` command name resolution.
pub static REQUEST_INFO: &[RequestInfo] = &[
    req_group!("View switching"),
    req!(ViewMain, "VIEW_MAIN", "Show main view"),
    req!(ViewDiff, "VIEW_DIFF", "Show diff view"),
    req!(ViewLog, "VIEW_LOG", "Show log view"),
    req!(ViewTree, "VIEW_TREE", "Show tree view"),
    req!(ViewBlob, "VIEW_BLOB", "Show blob view"),
    req!(ViewHelp, "VIEW_HELP", "Show help page"),
    req!(ViewPager, "VIEW_PAGER", "Show pager view"),
    req_group!("View manipulation"),
    req!(Enter, "ENTER", "Enter current line and scroll"),
    req!(Next, "NEXT", "Move to next"),
    req!(Previous, "PREVIOUS", "Move to previous"),
    req!(ViewNext, "VIEW_NEXT", "Move focus to next view"),
    req!(ViewClose, "VIEW_CLOSE", "Close the current view"),
    req!(Quit, "QUIT", "Close all views and quit"),
    req_group!("Cursor navigation"),
    req!(MoveUp, "MOVE_UP", "Move cursor one line up"),
    req!(MoveDown, "MOVE_DOWN", "Move cursor one line down"),
    req!(MovePageDown, "MOVE_PAGE_DOWN", "Move cursor one page down"),
    req!(MovePageUp, "MOVE_PAGE_UP", "Move cursor one page up"),
    req!(MoveFirstLine, "MOVE_FIRST_LINE", "Move cursor to first line"),
    req!(MoveLastLine, "MOVE_LAST_LINE", "Move cursor to last line"),
    req_group!("Scrolling"),
    req!(ScrollLineUp, "SCROLL_LINE_UP", "Scroll one line up"),
    req!(ScrollLineDown, "SCROLL_LINE_DOWN", "Scroll one line down"),
    req!(ScrollPageUp, "SCROLL_PAGE_UP", "Scroll one page up"),
    req!(ScrollPageDown, "SCROLL_PAGE_DOWN", "Scroll one page down"),
    req_group!("Searching"),
    req!(Search, "SEARCH", "Search the view"),
    req!(SearchBack, "SEARCH_BACK", "Search backwards in the view"),
    req!(FindNext, "FIND_NEXT", "Find next search match"),
    req!(FindPrev, "FIND_PREV", "Find previous search match"),
    req_group!("Misc"),
    req!(None, "NONE", "Do nothing"),
    req!(Prompt, "PROMPT", "Bring up the prompt"),
    req!(ScreenRedraw, "SCREEN_REDRAW", "Redraw the screen"),
    req!(ScreenResize, "SCREEN_RESIZE", "Resize the screen"),
    req!(ShowVersion, "SHOW_VERSION", "Show version information"),
    req!(StopLoading, "STOP_LOADING", "Stop all loading views"),
    req!(ToggleLineno, "TOGGLE_LINENO", "Toggle line numbers"),
    req!(ToggleRevGraph, "TOGGLE_REV_GRAPH", "Toggle revision graph visualization"),
];

impl Request {
    /// Resolve a `bind` command request name.
    pub fn from_name(name: &str) -> Option<Request> {
        REQUEST_INFO
            .iter()
            .filter_map(|info| info.request.map(|r| (r, info.name)))
            .find(|&(_, n)| enum_name_eq(n, name))
            .map(|(r, _)| r)
    }
}

/// A single keystroke, already translated out of the terminal encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Tab,
    Escape,
    Left,
    Right,
    Up,
    Down,
    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    F(u8),
}

/// Named keys accepted by the `bind` command. `Space` and `Hash` exist so
/// the config file never needs a literal blank or comment-starting `#`.
static KEY_NAMES: &[(&str, Key)] = &[
    ("Enter", Key::Enter),
    ("Space", Key::Char(' ')),
    ("Backspace", Key::Backspace),
    ("Tab", Key::Tab),
    ("Escape", Key::Escape),
    ("Left", Key::Left),
    ("Right", Key::Right),
    ("Up", Key::Up),
    ("Down", Key::Down),
    ("Insert", Key::Insert),
    ("Delete", Key::Delete),
    ("Hash", Key::Char('#')),
    ("Home", Key::Home),
    ("End", Key::End),
    ("PageUp", Key::PageUp),
    ("PageDown", Key::PageDown),
    ("F1", Key::F(1)),
    ("F2", Key::F(2)),
    ("F3", Key::F(3)),
    ("F4", Key::F(4)),
    ("F5", Key::F(5)),
    ("F6", Key::F(6)),
    ("F7", Key::F(7)),
    ("F8", Key::F(8)),
    ("F9", Key::F(9)),
    ("F10", Key::F(10)),
    ("F11", Key::F(11)),
    ("F12", Key::F(12)),
];

impl Key {
    /// Resolve a `bind` command key name: a named key or one printable
    /// character.
    pub fn from_name(name: &str) -> Option<Key> {
        if let Some(&(_, key)) = KEY_NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            return Some(key);
        }

        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(c), Option::None) if c.is_ascii_graphic() || c == ' ' => Some(Key::Char(c)),
            _ => Option::None,
        }
    }

    /// Presentation name for the help view.
    pub fn display_name(self) -> String {
        if let Some(&(name, _)) = KEY_NAMES.iter().find(|&&(_, k)| k == self) {
            return name.to_owned();
        }
        match self {
            Key::Char(c) => format!("'{c}'"),
            Key::F(n) => format!("F{n}"),
            _ => "'?'".to_owned(),
        }
    }
}

/// Binding scopes; `Generic` is the shared fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keymap {
    Generic,
    Main,
    Diff,
    Log,
    Tree,
    Blob,
    Pager,
    Help,
}

impl Keymap {
    pub const ALL: &'static [Keymap] = &[
        Keymap::Generic,
        Keymap::Main,
        Keymap::Diff,
        Keymap::Log,
        Keymap::Tree,
        Keymap::Blob,
        Keymap::Pager,
        Keymap::Help,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Keymap::Generic => "GENERIC",
            Keymap::Main => "MAIN",
            Keymap::Diff => "DIFF",
            Keymap::Log => "LOG",
            Keymap::Tree => "TREE",
            Keymap::Blob => "BLOB",
            Keymap::Pager => "PAGER",
            Keymap::Help => "HELP",
        }
    }

    pub fn from_name(name: &str) -> Option<Keymap> {
        Keymap::ALL
            .iter()
            .copied()
            .find(|map| enum_name_eq(map.name(), name))
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Compiled-in fallback bindings, consulted last and in this order.
pub static DEFAULT_BINDINGS: &[(Key, Request)] = &[
    // View switching
    (Key::Char('m'), Request::ViewMain),
    (Key::Char('d'), Request::ViewDiff),
    (Key::Char('l'), Request::ViewLog),
    (Key::Char('t'), Request::ViewTree),
    (Key::Char('b'), Request::ViewBlob),
    (Key::Char('p'), Request::ViewPager),
    (Key::Char('h'), Request::ViewHelp),
    // View manipulation
    (Key::Char('q'), Request::ViewClose),
    (Key::Tab, Request::ViewNext),
    (Key::Enter, Request::Enter),
    (Key::Up, Request::Previous),
    (Key::Down, Request::Next),
    // Cursor navigation
    (Key::Char('k'), Request::MoveUp),
    (Key::Char('j'), Request::MoveDown),
    (Key::Home, Request::MoveFirstLine),
    (Key::End, Request::MoveLastLine),
    (Key::PageDown, Request::MovePageDown),
    (Key::Char(' '), Request::MovePageDown),
    (Key::PageUp, Request::MovePageUp),
    // Duplicate of the blob binding above; scan order gives `b` to the
    // blob view and leaves page-up reachable through its other aliases.
    (Key::Char('b'), Request::MovePageUp),
    (Key::Char('-'), Request::MovePageUp),
    // Scrolling
    (Key::Insert, Request::ScrollLineUp),
    (Key::Delete, Request::ScrollLineDown),
    (Key::Char('w'), Request::ScrollPageUp),
    (Key::Char('s'), Request::ScrollPageDown),
    // Searching
    (Key::Char('/'), Request::Search),
    (Key::Char('?'), Request::SearchBack),
    (Key::Char('n'), Request::FindNext),
    (Key::Char('N'), Request::FindPrev),
    // Misc
    (Key::Char('Q'), Request::Quit),
    (Key::Char('z'), Request::StopLoading),
    (Key::Char('v'), Request::ShowVersion),
    (Key::Char('r'), Request::ScreenRedraw),
    (Key::Char('.'), Request::ToggleLineno),
    (Key::Char('g'), Request::ToggleRevGraph),
    (Key::Char(':'), Request::Prompt),
];

/// User bindings layered over [`DEFAULT_BINDINGS`].
#[derive(Debug, Default)]
pub struct Bindings {
    maps: [Vec<(Key, Request)>; Keymap::ALL.len()],
}

impl Bindings {
    pub fn new() -> Bindings {
        Bindings::default()
    }

    /// Register a user binding. Later bindings for the same key shadow
    /// earlier ones within the keymap.
    pub fn add(&mut self, keymap: Keymap, key: Key, request: Request) {
        self.maps[keymap.index()].insert(0, (key, request));
    }

    /// Look a key up in the given map, then the generic map, then the
    /// default table.
    pub fn get(&self, keymap: Keymap, key: Key) -> Option<Request> {
        let scoped = self.maps[keymap.index()]
            .iter()
            .chain(self.maps[Keymap::Generic.index()].iter());

        scoped
            .chain(DEFAULT_BINDINGS.iter())
            .find(|&&(k, _)| k == key)
            .map(|&(_, request)| request)
    }

    /// Default-table keys bound to `request`, for the help view.
    pub fn default_keys_for(request: Request) -> impl Iterator<Item = Key> {
        DEFAULT_BINDINGS
            .iter()
            .filter(move |&&(_, r)| r == request)
            .map(|&(k, _)| k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_b_resolves_to_blob_view() {
        let bindings = Bindings::new();
        assert_eq!(
            bindings.get(Keymap::Main, Key::Char('b')),
            Some(Request::ViewBlob)
        );
    }

    #[test]
    fn view_map_shadows_generic_shadows_default() {
        let mut bindings = Bindings::new();
        assert_eq!(
            bindings.get(Keymap::Main, Key::Char('q')),
            Some(Request::ViewClose)
        );

        bindings.add(Keymap::Generic, Key::Char('q'), Request::Quit);
        assert_eq!(
            bindings.get(Keymap::Main, Key::Char('q')),
            Some(Request::Quit)
        );

        bindings.add(Keymap::Main, Key::Char('q'), Request::ViewMain);
        assert_eq!(
            bindings.get(Keymap::Main, Key::Char('q')),
            Some(Request::ViewMain)
        );
        // Other keymaps still see the generic override only.
        assert_eq!(
            bindings.get(Keymap::Pager, Key::Char('q')),
            Some(Request::Quit)
        );
    }

    #[test]
    fn rebinding_within_a_map_shadows_the_older_binding() {
        let mut bindings = Bindings::new();
        bindings.add(Keymap::Diff, Key::Char('x'), Request::MoveUp);
        bindings.add(Keymap::Diff, Key::Char('x'), Request::MoveDown);
        assert_eq!(
            bindings.get(Keymap::Diff, Key::Char('x')),
            Some(Request::MoveDown)
        );
    }

    #[test]
    fn unbound_key_is_none() {
        let bindings = Bindings::new();
        assert_eq!(bindings.get(Keymap::Main, Key::Char('!')), Option::None);
    }

    #[test]
    fn request_names_resolve_loosely() {
        assert_eq!(Request::from_name("view-main"), Some(Request::ViewMain));
        assert_eq!(
            Request::from_name("toggle.rev.graph"),
            Some(Request::ToggleRevGraph)
        );
        assert_eq!(Request::from_name("bogus"), Option::None);
    }

    #[test]
    fn key_names_resolve() {
        assert_eq!(Key::from_name("PageUp"), Some(Key::PageUp));
        assert_eq!(Key::from_name("space"), Some(Key::Char(' ')));
        assert_eq!(Key::from_name("Hash"), Some(Key::Char('#')));
        assert_eq!(Key::from_name("x"), Some(Key::Char('x')));
        assert_eq!(Key::from_name("F11"), Some(Key::F(11)));
        assert_eq!(Key::from_name("NoSuchKey"), Option::None);
    }

    #[test]
    fn key_display_names() {
        assert_eq!(Key::Enter.display_name(), "Enter");
        assert_eq!(Key::Char(' ').display_name(), "Space");
        assert_eq!(Key::Char('m').display_name(), "'m'");
        assert_eq!(Key::F(5).display_name(), "F5");
    }

    #[test]
    fn every_catalog_name_resolves_to_its_request() {
        for info in REQUEST_INFO {
            if let Some(request) = info.request {
                assert_eq!(Request::from_name(info.name), Some(request));
            }
        }
    }
}
