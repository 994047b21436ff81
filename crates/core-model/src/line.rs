//! Line-oriented content detection.
//!
//! Every line streamed into a view is classified once, by longest-known
//! prefix, into a [`LineKind`]. The kind drives both presentation (each kind
//! carries a color/attribute triple in the [`Palette`]) and behavior (a
//! `Commit` line reacts to Enter, a `TreeDir` line reloads the tree, ...).
//!
//! The table below is matched in declaration order and the first hit wins.
//! Kinds with an empty prefix are never produced by classification; they
//! exist for decorations (cursor, titles, status) and for the composed cells
//! of the main and tree views, and remain addressable from the config file's
//! `color` command through the same names.

use crate::commit::Commit;
use core_text::enum_name_eq;

/// Terminal colors accepted by the `color` config command. `Default` keeps
/// whatever the terminal reports as its default fore-/background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Default,
    Black,
    Blue,
    Cyan,
    Green,
    Magenta,
    Red,
    White,
    Yellow,
}

impl Color {
    const NAMES: [(&'static str, Color); 9] = [
        ("DEFAULT", Color::Default),
        ("BLACK", Color::Black),
        ("BLUE", Color::Blue),
        ("CYAN", Color::Cyan),
        ("GREEN", Color::Green),
        ("MAGENTA", Color::Magenta),
        ("RED", Color::Red),
        ("WHITE", Color::White),
        ("YELLOW", Color::Yellow),
    ];

    pub fn from_name(name: &str) -> Option<Color> {
        Self::NAMES
            .iter()
            .find(|(n, _)| enum_name_eq(n, name))
            .map(|&(_, c)| c)
    }
}

/// Text attributes accepted by the `color` config command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    Normal,
    Blink,
    Bold,
    Dim,
    Reverse,
    Standout,
    Underline,
}

impl Attr {
    const NAMES: [(&'static str, Attr); 7] = [
        ("NORMAL", Attr::Normal),
        ("BLINK", Attr::Blink),
        ("BOLD", Attr::Bold),
        ("DIM", Attr::Dim),
        ("REVERSE", Attr::Reverse),
        ("STANDOUT", Attr::Standout),
        ("UNDERLINE", Attr::Underline),
    ];

    pub fn from_name(name: &str) -> Option<Attr> {
        Self::NAMES
            .iter()
            .find(|(n, _)| enum_name_eq(n, name))
            .map(|&(_, a)| a)
    }
}

/// One fg/bg/attr triple; the unit the config file recolors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineStyle {
    pub fg: Color,
    pub bg: Color,
    pub attr: Attr,
}

macro_rules! line_kinds {
    ($(($variant:ident, $name:literal, $prefix:literal, $fg:ident, $bg:ident, $attr:ident)),+ $(,)?) => {
        /// Semantic classification of a rendered line.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum LineKind {
            $($variant),+
        }

        impl LineKind {
            /// All kinds in declaration (= match priority) order.
            pub const ALL: &'static [LineKind] = &[$(LineKind::$variant),+];

            /// Config-facing name, matched with separator/case tolerance.
            pub fn name(self) -> &'static str {
                match self { $(LineKind::$variant => $name),+ }
            }

            /// Prefix that classifies a raw line as this kind; empty for
            /// decoration-only kinds.
            pub fn prefix(self) -> &'static str {
                match self { $(LineKind::$variant => $prefix),+ }
            }

            fn index(self) -> usize {
                self as usize
            }
        }

        impl Palette {
            /// Compiled-in colors; the config file's `color` command edits a
            /// copy of this before the first frame is drawn.
            pub fn built_in() -> Palette {
                Palette {
                    styles: [$(LineStyle {
                        fg: Color::$fg,
                        bg: Color::$bg,
                        attr: Attr::$attr,
                    }),+],
                }
            }
        }
    };
}

line_kinds![
    (DiffHeader, "DIFF_HEADER", "diff --git ", Yellow, Default, Normal),
    (DiffChunk, "DIFF_CHUNK", "@@", Magenta, Default, Normal),
    (DiffAdd, "DIFF_ADD", "+", Green, Default, Normal),
    (DiffDel, "DIFF_DEL", "-", Red, Default, Normal),
    (DiffIndex, "DIFF_INDEX", "index ", Blue, Default, Normal),
    (DiffOldMode, "DIFF_OLDMODE", "old file mode ", Yellow, Default, Normal),
    (DiffNewMode, "DIFF_NEWMODE", "new file mode ", Yellow, Default, Normal),
    (DiffCopyFrom, "DIFF_COPY_FROM", "copy from", Yellow, Default, Normal),
    (DiffCopyTo, "DIFF_COPY_TO", "copy to", Yellow, Default, Normal),
    (DiffRenameFrom, "DIFF_RENAME_FROM", "rename from", Yellow, Default, Normal),
    (DiffRenameTo, "DIFF_RENAME_TO", "rename to", Yellow, Default, Normal),
    (DiffSimilarity, "DIFF_SIMILARITY", "similarity ", Yellow, Default, Normal),
    (DiffDissimilarity, "DIFF_DISSIMILARITY", "dissimilarity ", Yellow, Default, Normal),
    (DiffTree, "DIFF_TREE", "diff-tree ", Blue, Default, Normal),
    (PpAuthor, "PP_AUTHOR", "Author: ", Cyan, Default, Normal),
    (PpCommit, "PP_COMMIT", "Commit: ", Magenta, Default, Normal),
    (PpMerge, "PP_MERGE", "Merge: ", Blue, Default, Normal),
    (PpDate, "PP_DATE", "Date:   ", Yellow, Default, Normal),
    (PpAdate, "PP_ADATE", "AuthorDate: ", Yellow, Default, Normal),
    (PpCdate, "PP_CDATE", "CommitDate: ", Yellow, Default, Normal),
    (PpRefs, "PP_REFS", "Refs: ", Red, Default, Normal),
    (Commit, "COMMIT", "commit ", Green, Default, Normal),
    (Parent, "PARENT", "parent ", Blue, Default, Normal),
    (Tree, "TREE", "tree ", Blue, Default, Normal),
    (Author, "AUTHOR", "author ", Cyan, Default, Normal),
    (Committer, "COMMITTER", "committer ", Magenta, Default, Normal),
    (Signoff, "SIGNOFF", "    Signed-off-by", Yellow, Default, Normal),
    (Default, "DEFAULT", "", Default, Default, Normal),
    (Cursor, "CURSOR", "", White, Green, Bold),
    (Status, "STATUS", "", Green, Default, Normal),
    (TitleBlur, "TITLE_BLUR", "", White, Blue, Normal),
    (TitleFocus, "TITLE_FOCUS", "", White, Blue, Bold),
    (MainDate, "MAIN_DATE", "", Blue, Default, Normal),
    (MainAuthor, "MAIN_AUTHOR", "", Green, Default, Normal),
    (MainCommit, "MAIN_COMMIT", "", Default, Default, Normal),
    (MainDelim, "MAIN_DELIM", "", Magenta, Default, Normal),
    (MainTag, "MAIN_TAG", "", Magenta, Default, Bold),
    (MainRef, "MAIN_REF", "", Cyan, Default, Bold),
    (TreeDir, "TREE_DIR", "", Default, Default, Normal),
    (TreeFile, "TREE_FILE", "", Default, Default, Normal),
];

impl LineKind {
    /// Resolve a config-file name (`color <name> ...`) to a kind.
    pub fn from_name(name: &str) -> Option<LineKind> {
        LineKind::ALL
            .iter()
            .copied()
            .find(|kind| enum_name_eq(kind.name(), name))
    }
}

/// Classify a raw line by case-insensitive prefix, first table hit wins.
/// `Default`'s empty prefix acts as the catch-all, so the kinds declared
/// after it are never classification results.
pub fn classify(line: &str) -> LineKind {
    let bytes = line.as_bytes();
    for &kind in LineKind::ALL {
        if kind == LineKind::Default {
            return LineKind::Default;
        }
        // Byte-wise comparison: a prefix boundary may fall inside a
        // multi-byte character of the line.
        let prefix = kind.prefix().as_bytes();
        if bytes.len() >= prefix.len() && bytes[..prefix.len()].eq_ignore_ascii_case(prefix) {
            return kind;
        }
    }
    LineKind::Default
}

/// Colors and attributes for every line kind. Mutable while the config file
/// loads, then handed to the renderer read-only.
#[derive(Debug, Clone)]
pub struct Palette {
    styles: [LineStyle; LineKind::ALL.len()],
}

impl Palette {
    pub fn style(&self, kind: LineKind) -> LineStyle {
        self.styles[kind.index()]
    }

    pub fn set_style(&mut self, kind: LineKind, style: LineStyle) {
        self.styles[kind.index()] = style;
    }
}

/// Payload of one buffered line: raw text for the pager-family views, a
/// parsed commit record for main-view rows.
#[derive(Debug)]
pub enum LinePayload {
    Text(String),
    Commit(Box<Commit>),
}

/// One entry of a view buffer.
#[derive(Debug)]
pub struct LineEntry {
    pub kind: LineKind,
    pub payload: LinePayload,
}

impl LineEntry {
    pub fn text(kind: LineKind, text: impl Into<String>) -> LineEntry {
        LineEntry {
            kind,
            payload: LinePayload::Text(text.into()),
        }
    }

    pub fn commit(commit: Commit) -> LineEntry {
        LineEntry {
            kind: LineKind::MainCommit,
            payload: LinePayload::Commit(Box::new(commit)),
        }
    }

    /// Text payload, or `None` for commit rows.
    pub fn as_text(&self) -> Option<&str> {
        match &self.payload {
            LinePayload::Text(text) => Some(text),
            LinePayload::Commit(_) => None,
        }
    }

    pub fn as_commit(&self) -> Option<&Commit> {
        match &self.payload {
            LinePayload::Commit(commit) => Some(commit),
            LinePayload::Text(_) => None,
        }
    }

    pub fn as_commit_mut(&mut self) -> Option<&mut Commit> {
        match &mut self.payload {
            LinePayload::Commit(commit) => Some(commit),
            LinePayload::Text(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_prefixes() {
        assert_eq!(classify("diff --git a/x b/x"), LineKind::DiffHeader);
        assert_eq!(classify("@@ -1,4 +1,6 @@"), LineKind::DiffChunk);
        assert_eq!(classify("+added"), LineKind::DiffAdd);
        assert_eq!(classify("-removed"), LineKind::DiffDel);
        assert_eq!(classify("commit 0123abc"), LineKind::Commit);
        assert_eq!(classify("author A U Thor <a@b> 0 +0000"), LineKind::Author);
        assert_eq!(classify("    Signed-off-by: X"), LineKind::Signoff);
        assert_eq!(classify("plain text"), LineKind::Default);
        assert_eq!(classify(""), LineKind::Default);
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(classify("COMMIT deadbeef"), LineKind::Commit);
        assert_eq!(classify("Diff --Git a b"), LineKind::DiffHeader);
    }

    #[test]
    fn declaration_order_resolves_prefix_overlap() {
        // "diff --git " must win over the later bare "-" / "+" markers and
        // "index " must not shadow anything before it.
        assert_eq!(classify("diff --git "), LineKind::DiffHeader);
        assert_eq!(classify("--- a/file"), LineKind::DiffDel);
        assert_eq!(classify("+++ b/file"), LineKind::DiffAdd);
    }

    #[test]
    fn no_earlier_kind_hides_a_later_intended_match() {
        // For every kind with a non-empty prefix, classifying its own prefix
        // must yield that kind: an earlier declaration never shadows it.
        for &kind in LineKind::ALL {
            let prefix = kind.prefix();
            if prefix.is_empty() {
                continue;
            }
            assert_eq!(classify(prefix), kind, "prefix {prefix:?}");
        }
    }

    #[test]
    fn classification_is_idempotent_on_preserved_text() {
        for line in ["diff --git a b", "@@ -1 +1 @@", "commit 1234", "x"] {
            let kind = classify(line);
            assert_eq!(classify(line), kind);
        }
    }

    #[test]
    fn kinds_resolve_by_config_name() {
        assert_eq!(LineKind::from_name("diff-header"), Some(LineKind::DiffHeader));
        assert_eq!(LineKind::from_name("Tree.Dir"), Some(LineKind::TreeDir));
        assert_eq!(LineKind::from_name("no-such-kind"), None);
    }

    #[test]
    fn palette_roundtrip() {
        let mut palette = Palette::built_in();
        assert_eq!(palette.style(LineKind::DiffHeader).fg, Color::Yellow);
        assert_eq!(palette.style(LineKind::Cursor).bg, Color::Green);
        assert_eq!(palette.style(LineKind::Cursor).attr, Attr::Bold);

        palette.set_style(
            LineKind::DiffHeader,
            LineStyle {
                fg: Color::Red,
                bg: Color::Black,
                attr: Attr::Underline,
            },
        );
        assert_eq!(palette.style(LineKind::DiffHeader).fg, Color::Red);
    }

    #[test]
    fn color_and_attr_names() {
        assert_eq!(Color::from_name("magenta"), Some(Color::Magenta));
        assert_eq!(Color::from_name("default"), Some(Color::Default));
        assert_eq!(Color::from_name("mauve"), None);
        assert_eq!(Attr::from_name("BOLD"), Some(Attr::Bold));
        assert_eq!(Attr::from_name("flash"), None);
    }
}
