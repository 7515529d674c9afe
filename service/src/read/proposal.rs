//! [`Proposal`] read model definitions.

use crate::domain::{proposal, user::session, Proposal};

/// Selector of a single [`Proposal`] by its [`proposal::Id`].
#[derive(Clone, Debug)]
pub struct Selector {
    /// ID of the [`Proposal`] to select.
    pub id: proposal::Id,

    /// [`session::Token`] to access the row store on behalf of.
    ///
    /// Anonymous access is used if [`None`].
    pub token: Option<session::Token>,
}

pub mod list {
    //! [`Proposal`]s list definitions.

    use std::cmp::Ordering;

    use derive_more::{AsRef, Display};
    use strum::{Display as StrumDisplay, EnumString};

    use crate::domain::{user::session, Proposal};

    /// Selector of a [`Proposal`]s list.
    #[derive(Clone, Debug, Default)]
    pub struct Selector {
        /// [`Filter`] to apply to the list.
        pub filter: Filter,

        /// [`session::Token`] to access the row store on behalf of.
        ///
        /// Anonymous access is used if [`None`].
        pub token: Option<session::Token>,
    }

    /// Filtering and ordering of a [`Proposal`]s list.
    #[derive(Clone, Debug, Default, Eq, PartialEq)]
    pub struct Filter {
        /// [`SearchTerm`] the listed [`Proposal`]s must match.
        pub search: Option<SearchTerm>,

        /// [`SortOrder`] of the listed [`Proposal`]s.
        pub order: SortOrder,
    }

    impl Filter {
        /// Indicates whether the provided [`Proposal`] passes this [`Filter`].
        #[must_use]
        pub fn matches(&self, proposal: &Proposal) -> bool {
            self.search.as_ref().map_or(true, |term| term.matches(proposal))
        }

        /// Compares two [`Proposal`]s according to the [`SortOrder`] of this
        /// [`Filter`].
        #[must_use]
        pub fn compare(&self, a: &Proposal, b: &Proposal) -> Ordering {
            let ord = collate(a.title.as_ref(), b.title.as_ref());
            match self.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        }

        /// Sorts the provided [`Proposal`]s according to this [`Filter`].
        ///
        /// Sorting is stable, so [`Proposal`]s with equal titles keep their
        /// relative order.
        pub fn sort(&self, proposals: &mut [Proposal]) {
            proposals.sort_by(|a, b| self.compare(a, b));
        }

        /// Filters and sorts the provided [`Proposal`]s according to this
        /// [`Filter`].
        #[must_use]
        pub fn apply(&self, proposals: Vec<Proposal>) -> Vec<Proposal> {
            let mut proposals: Vec<_> =
                proposals.into_iter().filter(|p| self.matches(p)).collect();
            self.sort(&mut proposals);
            proposals
        }
    }

    /// Free-text term to search [`Proposal`]s by.
    ///
    /// Matched case-insensitively as a substring of either the title or the
    /// ID of a [`Proposal`].
    #[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
    #[as_ref(str)]
    pub struct SearchTerm(String);

    impl SearchTerm {
        /// Creates a new [`SearchTerm`], unless the provided `term` is blank.
        #[must_use]
        pub fn new(term: impl Into<String>) -> Option<Self> {
            let term = term.into();
            (!term.trim().is_empty()).then_some(Self(term))
        }

        /// Indicates whether the provided [`Proposal`] matches this
        /// [`SearchTerm`].
        #[must_use]
        pub fn matches(&self, proposal: &Proposal) -> bool {
            let term = self.0.to_lowercase();
            proposal.title.as_ref().to_lowercase().contains(&term)
                || proposal.id.as_ref().to_lowercase().contains(&term)
        }
    }

    /// Order of a [`Proposal`]s list by their titles.
    #[derive(
        Clone, Copy, Debug, Default, EnumString, Eq, PartialEq, StrumDisplay,
    )]
    #[strum(serialize_all = "lowercase", ascii_case_insensitive)]
    pub enum SortOrder {
        /// From A to Z.
        #[default]
        Asc,

        /// From Z to A.
        Desc,
    }

    /// Compares two strings in a human (dictionary) order.
    ///
    /// Letters are compared case-insensitively with Latin diacritics folded
    /// first, then an unaccented letter goes before its accented variants, and
    /// finally a lowercase letter goes before its uppercase variant.
    #[must_use]
    pub fn collate(a: &str, b: &str) -> Ordering {
        fn lower(s: &str) -> impl Iterator<Item = char> + '_ {
            s.chars().flat_map(char::to_lowercase)
        }

        lower(a)
            .map(fold_diacritic)
            .cmp(lower(b).map(fold_diacritic))
            .then_with(|| lower(a).cmp(lower(b)))
            .then_with(|| {
                a.chars()
                    .map(char::is_uppercase)
                    .cmp(b.chars().map(char::is_uppercase))
            })
    }

    /// Strips a diacritic from the provided lowercase Latin letter.
    fn fold_diacritic(c: char) -> char {
        match c {
            'à'..='å' => 'a',
            'ç' => 'c',
            'è'..='ë' => 'e',
            'ì'..='ï' => 'i',
            'ñ' => 'n',
            'ò'..='ö' | 'ø' => 'o',
            'ù'..='ü' => 'u',
            'ý' | 'ÿ' => 'y',
            _ => c,
        }
    }

    #[cfg(test)]
    mod spec {
        use std::cmp::Ordering;

        use crate::domain::{proposal, Proposal};

        use super::{collate, Filter, SearchTerm, SortOrder};

        fn proposal(id: &str, title: &str) -> Proposal {
            Proposal {
                id: proposal::Id::new(id).unwrap(),
                title: title.into(),
                url: proposal::Url::default(),
            }
        }

        fn titles(proposals: &[Proposal]) -> Vec<&str> {
            proposals.iter().map(|p| p.title.as_ref()).collect()
        }

        #[test]
        fn collates_case_insensitively() {
            assert_eq!(collate("apple", "Banana"), Ordering::Less);
            assert_eq!(collate("Banana", "apple"), Ordering::Greater);
            assert_eq!(collate("a", "A"), Ordering::Less);
            assert_eq!(collate("same", "same"), Ordering::Equal);
        }

        #[test]
        fn collates_accents_next_to_base_letter() {
            assert_eq!(collate("Ação", "Azul"), Ordering::Less);
            assert_eq!(collate("Ética", "Fase"), Ordering::Less);
            assert_eq!(collate("e", "é"), Ordering::Less);
        }

        #[test]
        fn search_term_ignores_blank() {
            assert!(SearchTerm::new("").is_none());
            assert!(SearchTerm::new("   ").is_none());
            assert!(SearchTerm::new(" x ").is_some());
        }

        #[test]
        fn search_matches_title_or_id() {
            let term = SearchTerm::new("demo00").unwrap();
            assert!(term.matches(&proposal("DEMO001", "Web")));

            let term = SearchTerm::new("WEB").unwrap();
            assert!(term.matches(&proposal("X1", "Sistema Web")));
            assert!(!term.matches(&proposal("X2", "App Mobile")));
        }

        #[test]
        fn applies_filter_and_order() {
            let all = vec![
                proposal("3", "charlie"),
                proposal("1", "Alpha"),
                proposal("2", "bravo"),
            ];

            let asc = Filter::default().apply(all.clone());
            assert_eq!(titles(&asc), ["Alpha", "bravo", "charlie"]);

            let desc = Filter {
                search: None,
                order: SortOrder::Desc,
            }
            .apply(all.clone());
            assert_eq!(titles(&desc), ["charlie", "bravo", "Alpha"]);

            let searched = Filter {
                search: SearchTerm::new("A"),
                order: SortOrder::Asc,
            }
            .apply(all);
            assert_eq!(titles(&searched), ["Alpha", "bravo", "charlie"]);
        }

        #[test]
        fn parses_sort_order() {
            assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Asc);
            assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
            assert!("sideways".parse::<SortOrder>().is_err());
            assert_eq!(SortOrder::Desc.to_string(), "desc");
        }
    }
}
