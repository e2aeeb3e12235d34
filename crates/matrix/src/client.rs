//! Blocking client for the homeserver's membership and account APIs

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use notifier_core::{AccountService, MembershipService, Registration, RoomPowerLevels};

use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct JoinedRooms {
    #[serde(default)]
    joined_rooms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WhoAmI {
    user_id: String,
}

/// A third-party identifier bound to an account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThirdPartyId {
    pub medium: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
struct ThirdPartyIds {
    #[serde(default)]
    threepids: Vec<ThirdPartyId>,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    password: &'a str,
    auth: DummyAuth,
}

#[derive(Debug, Serialize)]
struct DummyAuth {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Homeserver client
///
/// Membership lookups use the configured service token; account calls use
/// the caller's own token.
pub struct MatrixClient {
    http: Client,
    homeserver: Url,
    access_token: String,
}

impl MatrixClient {
    /// Build a client; every request is bounded by `timeout`
    pub fn new(homeserver: &str, access_token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let homeserver = Url::parse(homeserver).map_err(|e| Error::Url(e.to_string()))?;
        if homeserver.cannot_be_a_base() {
            return Err(Error::Url(homeserver.to_string()));
        }

        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("notifier/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            homeserver,
            access_token: access_token.into(),
        })
    }

    /// Absolute URL for a path given as unescaped segments
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.homeserver.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| Error::Url(self.homeserver.to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn get<T: DeserializeOwned>(&self, url: Url, token: &str) -> Result<T> {
        debug!(%url, "GET");
        let response = self.http.get(url).bearer_auth(token).send()?;
        read(response)
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, url: Url, body: &B) -> Result<T> {
        debug!(%url, "POST");
        let response = self.http.post(url).json(body).send()?;
        read(response)
    }

    /// Rooms a user has joined (admin API)
    #[instrument(skip(self))]
    pub fn joined_rooms_of(&self, user_id: &str) -> Result<Vec<String>> {
        let url = self.endpoint(&["_synapse", "admin", "v1", "users", user_id, "joined_rooms"])?;
        let rooms: JoinedRooms = self.get(url, &self.access_token)?;
        Ok(rooms.joined_rooms)
    }

    /// Current `m.room.power_levels` state of a room
    #[instrument(skip(self))]
    pub fn power_levels(&self, room_id: &str) -> Result<RoomPowerLevels> {
        let url = self.endpoint(&[
            "_matrix",
            "client",
            "v3",
            "rooms",
            room_id,
            "state",
            "m.room.power_levels",
            "",
        ])?;
        self.get(url, &self.access_token)
    }

    /// Owner of an access token
    pub fn whoami_for(&self, access_token: &str) -> Result<String> {
        let url = self.endpoint(&["_matrix", "client", "v3", "account", "whoami"])?;
        let who: WhoAmI = self.get(url, access_token)?;
        Ok(who.user_id)
    }

    /// Third-party identifiers bound to the token's account
    pub fn threepids(&self, access_token: &str) -> Result<Vec<ThirdPartyId>> {
        let url = self.endpoint(&["_matrix", "client", "v3", "account", "3pid"])?;
        let ids: ThirdPartyIds = self.get(url, access_token)?;
        Ok(ids.threepids)
    }

    /// Register with the dummy interactive-auth stage
    #[instrument(skip(self, password))]
    pub fn register_dummy(&self, username: &str, password: &str) -> Result<Registration> {
        let url = self.endpoint(&["_matrix", "client", "v3", "register"])?;
        let request = RegisterRequest {
            username,
            password,
            auth: DummyAuth {
                kind: "m.login.dummy",
            },
        };
        self.post(url, &request)
    }
}

fn read<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json()?);
    }

    let body = response.text().unwrap_or_default();
    let err = Error::api(status.as_u16(), &body);
    warn!(error = %err, "Homeserver request failed");
    Err(err)
}

/// First email among an account's identifiers
pub fn first_email(ids: &[ThirdPartyId]) -> Option<String> {
    ids.iter()
        .find(|id| id.medium == "email")
        .map(|id| id.address.clone())
}

impl MembershipService for MatrixClient {
    fn joined_rooms(&self, user_id: &str) -> notifier_core::Result<Vec<String>> {
        Ok(self.joined_rooms_of(user_id)?)
    }

    fn room_power_levels(&self, room_id: &str) -> notifier_core::Result<RoomPowerLevels> {
        match self.power_levels(room_id) {
            Ok(levels) => Ok(levels),
            Err(Error::Api {
                status: 403 | 404, ..
            }) => Err(notifier_core::Error::RoomUnknown(room_id.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

impl AccountService for MatrixClient {
    fn whoami(&self, access_token: &str) -> notifier_core::Result<String> {
        Ok(self.whoami_for(access_token)?)
    }

    fn email(&self, access_token: &str) -> notifier_core::Result<Option<String>> {
        Ok(first_email(&self.threepids(access_token)?))
    }

    fn register(&self, username: &str, password: &str) -> notifier_core::Result<Registration> {
        Ok(self.register_dummy(username, password)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(homeserver: &str) -> MatrixClient {
        MatrixClient::new(homeserver, "service", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_endpoint_escapes_segments() {
        let client = client("https://matrix.example.org/");
        let url = client
            .endpoint(&["_synapse", "admin", "v1", "users", "@alice:example.org", "joined_rooms"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://matrix.example.org/_synapse/admin/v1/users/@alice:example.org/joined_rooms"
        );

        let url = client
            .endpoint(&["_matrix", "client", "v3", "rooms", "!a/b#c:x", "state"])
            .unwrap();
        assert!(url.as_str().ends_with("/rooms/!a%2Fb%23c:x/state"));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = client("https://example.org/matrix");
        let url = client.endpoint(&["_matrix", "client", "v3", "account", "whoami"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.org/matrix/_matrix/client/v3/account/whoami"
        );
    }

    #[test]
    fn test_invalid_homeserver() {
        assert!(matches!(
            MatrixClient::new("not a url", "t", Duration::from_secs(1)),
            Err(Error::Url(_))
        ));
        assert!(matches!(
            MatrixClient::new("mailto:ops@example.org", "t", Duration::from_secs(1)),
            Err(Error::Url(_))
        ));
    }

    #[test]
    fn test_first_email() {
        let ids = vec![
            ThirdPartyId {
                medium: "msisdn".into(),
                address: "15551234567".into(),
            },
            ThirdPartyId {
                medium: "email".into(),
                address: "alice@example.org".into(),
            },
        ];
        assert_eq!(first_email(&ids).as_deref(), Some("alice@example.org"));
        assert_eq!(first_email(&ids[..1]), None);
    }

    #[test]
    fn test_register_request_shape() {
        let request = RegisterRequest {
            username: "carol",
            password: "pw",
            auth: DummyAuth {
                kind: "m.login.dummy",
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["auth"]["type"], "m.login.dummy");
        assert_eq!(json["username"], "carol");
    }

    #[test]
    fn test_unreachable_homeserver_is_unavailable() {
        // Nothing listens on the discard port
        let client = client("http://127.0.0.1:9");
        let err: notifier_core::Error = client.joined_rooms("@alice:x").unwrap_err();
        assert!(matches!(err, notifier_core::Error::UpstreamUnavailable(_)));
    }

    #[test]
    fn test_stalled_homeserver_times_out() {
        use std::net::TcpListener;
        use std::time::Instant;

        // Accepts connections and never answers
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let mut held = Vec::new();
            for stream in listener.incoming() {
                held.push(stream);
            }
        });

        let client = MatrixClient::new(
            &format!("http://{}", addr),
            "service",
            Duration::from_millis(300),
        )
        .unwrap();

        let started = Instant::now();
        let err = client.room_power_levels("!r:x").unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, notifier_core::Error::UpstreamUnavailable(_)));
        assert!(elapsed >= Duration::from_millis(250), "returned after {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(5), "returned after {:?}", elapsed);
    }
}
