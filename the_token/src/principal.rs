//! Principals, their credential sets, and the directory that hosts them

use std::{
    collections::{btree_map::Entry, BTreeMap, BTreeSet},
    fmt,
    marker::PhantomData,
};

use async_trait::async_trait;
use serde::{
    de::{self, MapAccess, Visitor},
    Deserialize, Deserializer, Serialize,
};

use crate::{
    error::{PersistError, PrincipalResolutionError},
    ClientLabelRef, CredentialId, CredentialIdRef, LongLivedCredential, Username, UsernameRef,
};

/// A principal's long-lived credentials, keyed by credential id
///
/// A stored set is only accepted if every key is the id of the credential
/// under it, and no id appears twice.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CredentialSet(BTreeMap<CredentialId, LongLivedCredential>);

impl<'de> Deserialize<'de> for CredentialSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_map(KeyedMap::new("credential", stored_under_own_id))
            .map(Self)
    }
}

fn stored_under_own_id(id: &CredentialId, credential: &LongLivedCredential) -> bool {
    credential.id() == &**id
}

impl CredentialSet {
    /// Looks up a credential by id
    #[must_use]
    pub fn get(&self, id: &CredentialIdRef) -> Option<&LongLivedCredential> {
        self.0.get(id)
    }

    /// Finds the reusable credential carrying `label`
    ///
    /// Labels are not unique. When several credentials share one, the
    /// earliest created wins, then the smallest id, so the choice never
    /// depends on storage order.
    #[must_use]
    pub fn find_by_label(&self, label: &ClientLabelRef) -> Option<&LongLivedCredential> {
        self.0
            .values()
            .filter(|c| c.client_label() == label)
            .min_by(|a, b| {
                a.created_at()
                    .cmp(&b.created_at())
                    .then_with(|| a.id().cmp(b.id()))
            })
    }

    /// Inserts a credential under its id
    ///
    /// An existing credential with the same id is kept and the new one
    /// dropped; returns whether the insert happened.
    pub fn insert(&mut self, credential: LongLivedCredential) -> bool {
        match self.0.entry(credential.id().to_owned()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(credential);
                true
            }
        }
    }

    /// The number of credentials
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no credentials
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the credentials in id order
    pub fn iter(&self) -> impl Iterator<Item = &LongLivedCredential> {
        self.0.values()
    }
}

/// An identity able to own credentials
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    username: Username,
    name: String,
    #[serde(default)]
    credentials: CredentialSet,
}

impl Principal {
    /// A principal with no credentials, named after its username
    pub fn new(username: impl Into<Username>) -> Self {
        let username = username.into();
        Self {
            name: username.as_str().to_owned(),
            username,
            credentials: CredentialSet::default(),
        }
    }

    /// Sets the display name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The login name
    #[must_use]
    pub fn username(&self) -> &UsernameRef {
        &self.username
    }

    /// The display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The principal's credentials
    #[must_use]
    pub fn credentials(&self) -> &CredentialSet {
        &self.credentials
    }

    /// Mutable access to the principal's credentials
    pub fn credentials_mut(&mut self) -> &mut CredentialSet {
        &mut self.credentials
    }
}

/// The host's user directory
///
/// Implementations decide where principals live and how changes become
/// durable. Credential resolution mutates the principal handed out by
/// [`find_or_create_principal`][Self::find_or_create_principal]; the host
/// makes that durable when [`persist`][Self::persist] is called.
#[async_trait]
pub trait PrincipalDirectory: Send {
    /// Selects the principal to provision for, creating its record if the
    /// account exists but has never been used
    ///
    /// See [`select_username`] for the selection policy.
    async fn find_or_create_principal(
        &mut self,
        candidate: Option<&UsernameRef>,
    ) -> Result<&mut Principal, PrincipalResolutionError>;

    /// Makes any changes to principals durable
    async fn persist(&mut self) -> Result<(), PersistError>;
}

/// Chooses which account to operate on
///
/// * A requested username must be one of the `available` accounts.
/// * Without a request, a directory with exactly one account selects it.
/// * An empty directory, or one with several accounts and no request, is an error.
///
/// # Errors
///
/// Returns the [`PrincipalResolutionError`] describing why no account was selected.
pub fn select_username(
    available: &BTreeSet<Username>,
    candidate: Option<&UsernameRef>,
) -> Result<Username, PrincipalResolutionError> {
    if let Some(requested) = candidate {
        return if available.contains(requested) {
            Ok(requested.to_owned())
        } else {
            Err(PrincipalResolutionError::UnknownUser {
                requested: requested.to_owned(),
                available: available.iter().cloned().collect(),
            })
        };
    }

    let mut names = available.iter();
    match (names.next(), names.next()) {
        (Some(only), None) => Ok(only.clone()),
        (None, _) => Err(PrincipalResolutionError::NoUsers),
        (Some(_), Some(_)) => Err(PrincipalResolutionError::Ambiguous {
            available: available.iter().cloned().collect(),
        }),
    }
}

/// Accounts and the principals created for them
///
/// This is the document shape shared by the in-memory and file-backed
/// directories.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DirectoryState {
    #[serde(default)]
    pub(crate) accounts: BTreeSet<Username>,
    #[serde(default, deserialize_with = "deserialize_principals")]
    pub(crate) principals: BTreeMap<Username, Principal>,
}

fn deserialize_principals<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<Username, Principal>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_map(KeyedMap::new("principal", stored_under_own_name))
}

fn stored_under_own_name(username: &Username, principal: &Principal) -> bool {
    principal.username() == &**username
}

/// Reads a map whose values each carry their own key
///
/// Rejects an entry stored under a key other than its own, and a key seen
/// twice.
struct KeyedMap<K, V> {
    what: &'static str,
    matches: fn(&K, &V) -> bool,
    _p: PhantomData<fn() -> (K, V)>,
}

impl<K, V> KeyedMap<K, V> {
    fn new(what: &'static str, matches: fn(&K, &V) -> bool) -> Self {
        Self {
            what,
            matches,
            _p: PhantomData,
        }
    }
}

impl<'de, K, V> Visitor<'de> for KeyedMap<K, V>
where
    K: Deserialize<'de> + Ord + fmt::Display,
    V: Deserialize<'de>,
{
    type Value = BTreeMap<K, V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a map of each {} by its own key", self.what)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = BTreeMap::new();
        while let Some((key, value)) = access.next_entry::<K, V>()? {
            if !(self.matches)(&key, &value) {
                return Err(de::Error::custom(format_args!(
                    "{} stored under '{}' does not carry that key",
                    self.what, key
                )));
            }

            match map.entry(key) {
                Entry::Occupied(slot) => {
                    return Err(de::Error::custom(format_args!(
                        "duplicate {} '{}'",
                        self.what,
                        slot.key()
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
            }
        }
        Ok(map)
    }
}

impl DirectoryState {
    pub(crate) fn add_account(&mut self, username: impl Into<Username>) -> bool {
        self.accounts.insert(username.into())
    }

    pub(crate) fn find_or_create_principal(
        &mut self,
        candidate: Option<&UsernameRef>,
    ) -> Result<&mut Principal, PrincipalResolutionError> {
        let username = select_username(&self.accounts, candidate)?;
        let principal = self.principals.entry(username).or_insert_with_key(|name| {
            tracing::debug!(user = %name, "creating principal for account");
            Principal::new(name.clone())
        });
        Ok(principal)
    }
}

/// A directory held entirely in memory
///
/// [`persist`][PrincipalDirectory::persist] only counts how often it was asked.
#[derive(Clone, Debug, Default)]
pub struct InMemoryDirectory {
    state: DirectoryState,
    persisted: usize,
}

impl InMemoryDirectory {
    /// An empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account
    #[must_use]
    pub fn with_account(mut self, username: impl Into<Username>) -> Self {
        self.state.add_account(username);
        self
    }

    /// Registers an account, returning whether it was new
    pub fn add_account(&mut self, username: impl Into<Username>) -> bool {
        self.state.add_account(username)
    }

    /// Looks up the principal created for an account
    #[must_use]
    pub fn principal(&self, username: &UsernameRef) -> Option<&Principal> {
        self.state.principals.get(username)
    }

    /// How many times changes were persisted
    #[must_use]
    pub fn persist_count(&self) -> usize {
        self.persisted
    }
}

#[async_trait]
impl PrincipalDirectory for InMemoryDirectory {
    async fn find_or_create_principal(
        &mut self,
        candidate: Option<&UsernameRef>,
    ) -> Result<&mut Principal, PrincipalResolutionError> {
        self.state.find_or_create_principal(candidate)
    }

    async fn persist(&mut self) -> Result<(), PersistError> {
        self.persisted += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;
    use crate::test;

    fn accounts(names: &[&'static str]) -> BTreeSet<Username> {
        names.iter().copied().map(Username::from_static).collect()
    }

    #[test]
    fn single_account_is_selected_without_request() {
        let selected = select_username(&accounts(&["homeowner"]), None).unwrap();
        assert_eq!(selected.as_str(), "homeowner");
    }

    #[test]
    fn requested_account_must_exist() {
        let available = accounts(&["alice", "bob"]);

        let selected = select_username(&available, Some(UsernameRef::from_str("bob"))).unwrap();
        assert_eq!(selected.as_str(), "bob");

        let err = select_username(&available, Some(UsernameRef::from_str("carol"))).unwrap_err();
        assert!(matches!(err, PrincipalResolutionError::UnknownUser { .. }));
        assert_eq!(
            err.to_string(),
            "user 'carol' not found, available users: alice, bob"
        );
    }

    #[test]
    fn empty_and_ambiguous_directories_are_errors() {
        assert!(matches!(
            select_username(&accounts(&[]), None),
            Err(PrincipalResolutionError::NoUsers)
        ));
        assert!(matches!(
            select_username(&accounts(&["alice", "bob"]), None),
            Err(PrincipalResolutionError::Ambiguous { .. })
        ));
    }

    #[test]
    fn insert_keeps_existing_credential_for_id() {
        let mut set = CredentialSet::default();
        let original = test::credential();

        let mut replacement = test::template();
        replacement.client_label = crate::ClientLabel::from_static("Replacement");
        let replacement = replacement.materialize(original.owner());

        assert!(set.insert(original.clone()));
        assert!(!set.insert(replacement));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(original.id()), Some(&original));
    }

    #[test]
    fn stored_set_round_trips() -> Result<()> {
        let mut set = CredentialSet::default();
        set.insert(test::credential());

        let back: CredentialSet = serde_json::from_str(&serde_json::to_string(&set)?)?;
        assert_eq!(back, set);
        Ok(())
    }

    #[test]
    fn stored_set_rejects_credential_under_foreign_id() -> Result<()> {
        let record = serde_json::to_string(&test::credential())?;
        let json = format!(r#"{{ "someone-else": {} }}"#, record);

        let err = serde_json::from_str::<CredentialSet>(&json).unwrap_err();
        assert!(err.to_string().contains("credential stored under 'someone-else'"));
        Ok(())
    }

    #[test]
    fn stored_set_rejects_repeated_id() -> Result<()> {
        let id = test::credential().id().to_owned();
        let record = serde_json::to_string(&test::credential())?;
        let json = format!(r#"{{ "{id}": {record}, "{id}": {record} }}"#);

        let err = serde_json::from_str::<CredentialSet>(&json).unwrap_err();
        assert!(err.to_string().contains("duplicate credential"));
        Ok(())
    }

    #[test]
    fn directory_rejects_principal_under_foreign_name() -> Result<()> {
        let principal = serde_json::to_string(&Principal::new("alice"))?;
        let json = format!(
            r#"{{ "accounts": ["bob"], "principals": {{ "bob": {} }} }}"#,
            principal
        );

        assert!(serde_json::from_str::<DirectoryState>(&json).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn in_memory_directory_creates_principal_once() -> Result<()> {
        let mut directory = InMemoryDirectory::new().with_account("homeowner");

        directory
            .find_or_create_principal(None)
            .await?
            .credentials_mut()
            .insert(test::credential());

        let principal = directory.find_or_create_principal(None).await?;
        assert_eq!(principal.name(), "homeowner");
        assert_eq!(principal.credentials().len(), 1);
        Ok(())
    }
}
