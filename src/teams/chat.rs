//! Chat thread of a match request, open to the managers of both teams.

use tracing::info;
use uuid::Uuid;

use super::errors::{TeamError, TeamResult};
use super::models::ChatMessage;
use super::service::RosterService;

impl RosterService {
    /// Messages of a request, oldest first
    pub fn list_messages(&self, user_id: Uuid, request_id: Uuid) -> TeamResult<Vec<ChatMessage>> {
        let request = self.participating_request(user_id, request_id)?;
        let mut messages = self.chat.messages_for(request.id)?;
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }

    /// One message of a request's thread; 404 if it belongs to another thread
    pub fn get_message(&self, user_id: Uuid, request_id: Uuid, message_id: Uuid) -> TeamResult<ChatMessage> {
        let request = self.participating_request(user_id, request_id)?;
        self.chat
            .messages_for(request.id)?
            .into_iter()
            .find(|m| m.id == message_id)
            .ok_or(TeamError::NotFound("Chat message"))
    }

    /// Post into a request's thread on behalf of the user's participating team
    pub fn post_message(&self, user_id: Uuid, request_id: Uuid, content: &str) -> TeamResult<ChatMessage> {
        let request = self.participating_request(user_id, request_id)?;

        let sender_team_id = if self.manages(user_id, request.requester_id)? {
            request.requester_id
        } else {
            request.receiver_id
        };

        let message = ChatMessage::new(request.id, user_id, Some(sender_team_id), content)?;
        self.chat.add_message(&message)?;
        self.metrics.increment_messages_posted();

        info!(
            request_id = %request.id,
            sender_team_id = %sender_team_id,
            preview = %message.preview(),
            "chat message posted"
        );
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::teams::errors::TeamError;
    use crate::teams::requests::NewMatchRequest;
    use crate::teams::service::tests::Fixture;

    #[test]
    fn test_chat_between_participants() {
        let fx = Fixture::new();
        let alice = fx.user("alice");
        let bob = fx.user("bob");
        let carol = fx.user("carol");
        let dragons = fx.team(alice, "Dragons", 2);
        let tigers = fx.team(bob, "Tigers", 2);
        fx.team(carol, "Owls", 2);

        let request = fx
            .service
            .create_request(
                alice,
                NewMatchRequest {
                    requester_id: dragons.id,
                    receiver_id: tigers.id,
                    match_time: Utc::now() + Duration::days(2),
                    location: String::new(),
                },
            )
            .unwrap();

        let first = fx.service.post_message(alice, request.id, "  See you at 7?  ").unwrap();
        assert_eq!(first.content, "See you at 7?");
        assert_eq!(first.sender_team_id, Some(dragons.id));

        let reply = fx.service.post_message(bob, request.id, "Works for us").unwrap();
        assert_eq!(reply.sender_team_id, Some(tigers.id));

        let err = fx.service.post_message(carol, request.id, "hi").unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert_eq!(fx.service.list_messages(carol, request.id).unwrap_err().status_code(), 403);

        let err = fx.service.post_message(alice, request.id, "   ").unwrap_err();
        assert!(matches!(err, TeamError::Validation(_)));

        let thread = fx.service.list_messages(bob, request.id).unwrap();
        let contents: Vec<&str> = thread.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["See you at 7?", "Works for us"]);
        assert_eq!(fx.metrics.snapshot().messages_posted, 2);
    }

    #[test]
    fn test_single_message_lookup() {
        let fx = Fixture::new();
        let alice = fx.user("alice");
        let bob = fx.user("bob");
        let carol = fx.user("carol");
        let dragons = fx.team(alice, "Dragons", 2);
        let tigers = fx.team(bob, "Tigers", 2);
        let owls = fx.team(carol, "Owls", 2);

        let new = |receiver_id| NewMatchRequest {
            requester_id: dragons.id,
            receiver_id,
            match_time: Utc::now() + Duration::days(2),
            location: String::new(),
        };
        let with_tigers = fx.service.create_request(alice, new(tigers.id)).unwrap();
        let with_owls = fx.service.create_request(alice, new(owls.id)).unwrap();

        let message = fx.service.post_message(alice, with_tigers.id, "Bring bibs").unwrap();
        let fetched = fx.service.get_message(bob, with_tigers.id, message.id).unwrap();
        assert_eq!(fetched.content, "Bring bibs");

        // carol sees the owls thread, not the tigers one
        let err = fx.service.get_message(carol, with_tigers.id, message.id).unwrap_err();
        assert_eq!(err.status_code(), 403);
        let err = fx.service.get_message(carol, with_owls.id, message.id).unwrap_err();
        assert!(matches!(err, TeamError::NotFound("Chat message")));
    }

    #[test]
    fn test_chat_on_missing_request() {
        let fx = Fixture::new();
        let alice = fx.user("alice");
        let err = fx.service.list_messages(alice, uuid::Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, TeamError::NotFound("Match request")));
    }
}
