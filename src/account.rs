use indexmap::{IndexMap, IndexSet};

/// One node in the account hierarchy. Identity is the full colon-joined
/// path (`assets:bank:checking`); the short name and parent path are
/// derived from it, so the tree carries no owning back-pointers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Account {
    name: String,
    children: IndexSet<String>,
    declared: bool,
    default_balancing: bool,
    note: Option<String>,
}

impl Account {
    pub fn new(name: &str) -> Self {
        Account {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Fully-qualified colon-joined path.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last path segment.
    pub fn short_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    /// Path of the parent account, `None` at the root level.
    pub fn parent_name(&self) -> Option<&str> {
        self.name.rsplit_once(':').map(|(parent, _)| parent)
    }

    /// Full paths of direct children, in creation order.
    pub fn children(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(String::as_str)
    }

    pub fn is_declared(&self) -> bool {
        self.declared
    }

    pub fn is_default_balancing(&self) -> bool {
        self.default_balancing
    }

    pub fn set_default_balancing(&mut self, flag: bool) {
        self.default_balancing = flag;
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn set_note(&mut self, note: &str) {
        self.note = Some(note.to_string());
    }
}

/// The account tree: an arena of accounts keyed by full path. Accounts are
/// created lazily on first reference and never deleted during a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AccountStore {
    accounts: IndexMap<String, Account>,
}

impl AccountStore {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn get(&self, name: &str) -> Option<&Account> {
        self.accounts.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Account> {
        self.accounts.get_mut(name)
    }

    /// Walk the path segment by segment, creating and linking every absent
    /// ancestor, and return the leaf. Idempotent: repeated calls with the
    /// same path yield the same entry.
    pub fn get_or_create(&mut self, name: &str) -> &Account {
        let mut fullname = String::new();
        for segment in name.split(':') {
            let parent = fullname.clone();
            if !fullname.is_empty() {
                fullname.push(':');
            }
            fullname.push_str(segment);

            if !self.accounts.contains_key(&fullname) {
                self.accounts
                    .insert(fullname.clone(), Account::new(&fullname));
            }
            if !parent.is_empty() {
                if let Some(p) = self.accounts.get_mut(&parent) {
                    p.children.insert(fullname.clone());
                }
            }
        }
        &self.accounts[fullname.as_str()]
    }

    /// Mark the account as declared, creating it first when absent.
    /// Declaring is idempotent.
    pub fn declare(&mut self, name: &str) -> &mut Account {
        self.get_or_create(name);
        let account = self.accounts.get_mut(name).unwrap();
        account.declared = true;
        account
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.accounts.get(name).is_some_and(Account::is_declared)
    }

    pub fn declared_accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values().filter(|a| a.declared)
    }

    /// Accounts whose full path matches the prefix at `:`-segment
    /// boundaries. `assets:bank` matches itself and `assets:bank:checking`
    /// but never `assets:bankroll`.
    pub fn sub_accounts_of(&self, prefix: &str) -> Vec<&Account> {
        self.accounts
            .values()
            .filter(|account| {
                account.name == prefix
                    || account
                        .name
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with(':'))
            })
            .collect()
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
