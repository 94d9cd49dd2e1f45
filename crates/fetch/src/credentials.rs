use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{HeaderParseError, NetworkError};

/// Kind of server a protection space belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerType {
    Http,
    Ftp,
}

/// Authentication scheme of a protection space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthScheme {
    Basic,
    Digest,
    Ntlm,
    /// Scheme-less spaces such as FTP logins
    Default,
}

/// The scope a credential is valid for.
///
/// All five fields take part in equality. Dropping the realm leaks
/// credentials between realms on one host; adding anything volatile makes
/// every lookup miss and the job keeps prompting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProtectionSpace {
    pub host: String,
    pub port: u16,
    pub server_type: ServerType,
    pub scheme: AuthScheme,
    pub realm: String,
}

impl ProtectionSpace {
    /// Build the protection space for a URL, using the scheme's default port when none is given
    pub fn for_url(url: &Url, server_type: ServerType, scheme: AuthScheme, realm: &str) -> Option<Self> {
        Some(Self {
            host: url.host_str()?.to_ascii_lowercase(),
            port: url.port_or_known_default()?,
            server_type,
            scheme,
            realm: realm.to_string(),
        })
    }
}

/// How long a credential should be remembered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CredentialPersistence {
    None,
    #[default]
    ForSession,
    Permanent,
}

/// A username/password pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub user: String,
    pub password: String,
    pub persistence: CredentialPersistence,
}

impl Credential {
    pub fn new(user: &str, password: &str, persistence: CredentialPersistence) -> Self {
        Self {
            user: user.to_string(),
            password: password.to_string(),
            persistence,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_empty() && self.password.is_empty()
    }
}

/// Process-lifetime association from protection spaces to credentials
#[derive(Debug, Default)]
pub struct CredentialStore {
    entries: HashMap<ProtectionSpace, Credential>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a credential. `CredentialPersistence::None` credentials are not kept.
    pub fn set(&mut self, space: ProtectionSpace, credential: Credential) {
        if credential.persistence == CredentialPersistence::None {
            return;
        }
        self.entries.insert(space, credential);
    }

    pub fn get(&self, space: &ProtectionSpace) -> Option<&Credential> {
        self.entries.get(space)
    }

    pub fn remove(&mut self, space: &ProtectionSpace) -> Option<Credential> {
        self.entries.remove(space)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the permanent entries as JSON
    pub fn export_permanent(&self) -> Result<String, NetworkError> {
        let permanent: Vec<(&ProtectionSpace, &Credential)> = self
            .entries
            .iter()
            .filter(|(_, c)| c.persistence == CredentialPersistence::Permanent)
            .collect();
        Ok(serde_json::to_string(&permanent)?)
    }

    /// Load entries produced by [`CredentialStore::export_permanent`]
    pub fn import(&mut self, json: &str) -> Result<usize, NetworkError> {
        let entries: Vec<(ProtectionSpace, Credential)> = serde_json::from_str(json)?;
        let count = entries.len();
        for (space, credential) in entries {
            self.set(space, credential);
        }
        Ok(count)
    }
}

/// The credential currently attached to a request, travelling with it across restarts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    pub protection_space: ProtectionSpace,
    pub credential: Credential,
    /// Whether the credential is already in the store
    pub stored: bool,
}

/// A parsed `WWW-Authenticate` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChallenge {
    pub scheme: AuthScheme,
    pub realm: String,
}

/// Parse a challenge header into scheme and realm.
///
/// A bare `NTLM` challenge has no realm; it gets the realm `NTLM`.
pub fn parse_challenge(header: &str) -> Result<ParsedChallenge, HeaderParseError> {
    let header = header.trim();
    if header.eq_ignore_ascii_case("ntlm") {
        return Ok(ParsedChallenge {
            scheme: AuthScheme::Ntlm,
            realm: "NTLM".to_string(),
        });
    }

    let (scheme, params) = header.split_once(' ').ok_or(HeaderParseError::MissingScheme)?;
    let scheme = if scheme.eq_ignore_ascii_case("basic") {
        AuthScheme::Basic
    } else if scheme.eq_ignore_ascii_case("digest") {
        AuthScheme::Digest
    } else {
        return Err(HeaderParseError::UnsupportedScheme(scheme.to_string()));
    };

    let realm = auth_param(params, "realm")?.ok_or(HeaderParseError::MissingRealm)?;

    Ok(ParsedChallenge { scheme, realm })
}

/// Find one `name=value` auth-param in a comma separated list. Names are
/// matched case-insensitively and quoted values may contain commas and
/// backslash escapes.
fn auth_param(params: &str, name: &str) -> Result<Option<String>, HeaderParseError> {
    let mut rest = params;
    loop {
        rest = rest.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        let Some((key, after)) = rest.split_once('=') else {
            return Ok(None);
        };
        let key = key.trim();
        let after = after.trim_start();

        let (value, next) = match after.strip_prefix('"') {
            Some(quoted) => {
                let mut value = String::new();
                let mut end = None;
                let mut chars = quoted.char_indices();
                while let Some((at, c)) = chars.next() {
                    match c {
                        '\\' => value.extend(chars.next().map(|(_, escaped)| escaped)),
                        '"' => {
                            end = Some(at + 1);
                            break;
                        }
                        _ => value.push(c),
                    }
                }
                match end {
                    Some(end) => (value, &quoted[end..]),
                    None if key.eq_ignore_ascii_case(name) => return Err(HeaderParseError::UnterminatedRealm),
                    None => return Ok(None),
                }
            }
            None => {
                let end = after.find(',').unwrap_or(after.len());
                (after[..end].trim().to_string(), &after[end..])
            }
        };

        if key.eq_ignore_ascii_case(name) {
            return Ok(Some(value));
        }
        rest = next;
    }
}
