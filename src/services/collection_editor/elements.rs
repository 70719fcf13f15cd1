use super::{EmbeddedElement, Resettable};
use crate::{
    dao::models::{GameEntity, PlayerEntity, QuestionEntity},
    dto::game::{
        CreateGameRequest, CreatePlayerRequest, CreateQuestionRequest, UpdateGameRequest,
        UpdatePlayerRequest, UpdateQuestionRequest,
    },
};

impl EmbeddedElement for QuestionEntity {
    const KIND: &'static str = "question";
    const LIST_FIELD: &'static str = "questions";
    const ID_FIELD: &'static str = "questionId";

    type Draft = CreateQuestionRequest;
    type Update = UpdateQuestionRequest;

    fn from_draft(id: String, draft: Self::Draft) -> Self {
        Self {
            question_id: id,
            question: draft.question,
            is_asked: false,
        }
    }

    fn with_update(self, update: Self::Update) -> Self {
        Self {
            question: update.question,
            is_asked: update.is_asked,
            ..self
        }
    }
}

impl EmbeddedElement for PlayerEntity {
    const KIND: &'static str = "player";
    const LIST_FIELD: &'static str = "players";
    const ID_FIELD: &'static str = "playerId";

    type Draft = CreatePlayerRequest;
    type Update = UpdatePlayerRequest;

    fn from_draft(id: String, draft: Self::Draft) -> Self {
        Self {
            player_id: id,
            name: draft.name,
            score: 0,
        }
    }

    fn with_update(self, update: Self::Update) -> Self {
        Self {
            name: update.name,
            score: update.score,
            ..self
        }
    }
}

/// Games embedded in a user document.
impl EmbeddedElement for GameEntity {
    const KIND: &'static str = "game";
    const LIST_FIELD: &'static str = "games";
    const ID_FIELD: &'static str = "gameId";

    type Draft = CreateGameRequest;
    type Update = UpdateGameRequest;

    fn from_draft(id: String, draft: Self::Draft) -> Self {
        GameEntity::new(id, draft.title)
    }

    fn with_update(mut self, update: Self::Update) -> Self {
        self.title = update.title;
        if let Some(winner) = update.winner {
            self.winner = winner;
        }
        self
    }
}

impl Resettable for GameEntity {
    const RESET_FIELDS: &'static [&'static str] = &["questions", "players", "winner"];

    fn reset(&mut self) {
        for player in &mut self.players {
            player.score = 0;
        }
        for question in &mut self.questions {
            question.is_asked = false;
        }
        self.winner = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_update_keeps_lists_and_honours_winner_tristate() {
        let mut game = GameEntity::new("g1".into(), "old".into());
        game.players.push(PlayerEntity::from_draft(
            "p1".into(),
            CreatePlayerRequest { name: "Ana".into() },
        ));
        game.winner = Some("p1".into());

        let kept = game.clone().with_update(UpdateGameRequest {
            title: "new".into(),
            winner: None,
        });
        assert_eq!(kept.title, "new");
        assert_eq!(kept.winner.as_deref(), Some("p1"));
        assert_eq!(kept.players.len(), 1);

        let cleared = game.with_update(UpdateGameRequest {
            title: "new".into(),
            winner: Some(None),
        });
        assert_eq!(cleared.winner, None);
    }
}
