#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::Duration;

    use crate::{
        common::error::ServerError,
        features::{
            session::{
                models::{QuizSession, SessionStatus},
                repository::{
                    generate_session_token, get_session_by_token, shuffle_question_order,
                    tx_advance_session, tx_complete_session,
                },
            },
            student::repository::{find_or_create_student, find_student},
        },
        tests::fixtures::{count_rows, create_quiz, epoch, setup_app_state},
    };

    fn session_at(order: Vec<i64>, completed: bool) -> QuizSession {
        QuizSession {
            id: 1,
            session_token: "token".into(),
            student_id: 1,
            quiz_id: 1,
            question_order: order,
            current_index: 0,
            started_at: epoch(),
            expires_at: epoch() + Duration::minutes(30),
            completed_at: completed.then(|| epoch() + Duration::minutes(5)),
        }
    }

    #[test]
    fn session_tokens_are_long_hex_and_unique() {
        let tokens: HashSet<String> = (0..200).map(|_| generate_session_token()).collect();

        assert_eq!(tokens.len(), 200);
        for token in &tokens {
            assert_eq!(token.len(), 64);
            assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn shuffle_keeps_every_question_exactly_once() {
        let ids: Vec<i64> = (1..=20).collect();

        let mut seen_orders = HashSet::new();
        for _ in 0..50 {
            let order = shuffle_question_order(&ids);
            let mut sorted = order.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, ids);
            seen_orders.insert(order);
        }

        assert!(seen_orders.len() > 1, "shuffle never changed the order");
    }

    #[test]
    fn status_is_derived_from_completion_then_expiry() {
        let active = session_at(vec![1, 2], false);
        let status = SessionStatus::of(&active, epoch() + Duration::minutes(29));
        assert_eq!(status, SessionStatus::Active { current_index: 0 });
        assert!(status.rejection().is_none());

        let expired = SessionStatus::of(&active, epoch() + Duration::minutes(30));
        assert_eq!(
            expired,
            SessionStatus::Expired {
                expired_at: epoch() + Duration::minutes(30)
            }
        );

        let done = session_at(vec![1, 2], true);
        assert_eq!(
            SessionStatus::of(&done, epoch() + Duration::hours(2)),
            SessionStatus::Completed {
                completed_at: epoch() + Duration::minutes(5)
            }
        );
    }

    #[test]
    fn last_question_is_detected_from_the_pointer() {
        let mut session = session_at(vec![7, 3, 9], false);
        assert_eq!(session.current_question_id(), Some(7));
        assert!(!session.is_last_question());

        session.current_index = 2;
        assert_eq!(session.current_question_id(), Some(9));
        assert!(session.is_last_question());
        assert_eq!(session.total_questions(), 3);
    }

    #[tokio::test]
    async fn missing_section_is_its_own_identity() {
        let app = setup_app_state().await;

        let unsectioned = find_or_create_student(app.pool(), "Bob", None, epoch()).await.unwrap();
        let blank = find_or_create_student(app.pool(), "bob", Some("  "), epoch()).await.unwrap();
        let named = find_or_create_student(app.pool(), "Bob", Some("IT-B"), epoch()).await.unwrap();

        assert_eq!(unsectioned.id, blank.id);
        assert_ne!(unsectioned.id, named.id);
        assert!(unsectioned.section.is_none());
        assert_eq!(named.section.as_deref(), Some("IT-B"));
        assert_eq!(count_rows(app.pool(), "students").await, 2);

        let found = find_student(app.pool(), "BOB", Some("it-b")).await.unwrap().unwrap();
        assert_eq!(found.id, named.id);
    }

    #[tokio::test]
    async fn existing_student_is_never_rewritten() {
        let app = setup_app_state().await;

        let first = find_or_create_student(app.pool(), "Carol", Some("IT-C"), epoch()).await.unwrap();
        let again = find_or_create_student(
            app.pool(),
            "CAROL",
            Some("it-c"),
            epoch() + Duration::days(1),
        )
        .await
        .unwrap();

        assert_eq!(first.id, again.id);
        assert_eq!(again.name, "Carol");
        assert_eq!(again.created_at, epoch());
    }

    #[tokio::test]
    async fn corrupt_question_order_surfaces_as_codec_error() {
        let app = setup_app_state().await;
        let quiz_id = create_quiz(app.pool(), "Broken", true, epoch()).await;
        let student = find_or_create_student(app.pool(), "Dave", Some("IT-D"), epoch()).await.unwrap();

        for (token, order) in [("garbled", "not json"), ("empty", "[]"), ("dupes", "[4,4]")] {
            sqlx::query("DELETE FROM \"quiz_sessions\"")
                .execute(app.pool())
                .await
                .unwrap();
            sqlx::query(
                r#"
                INSERT INTO "quiz_sessions"
                    (session_token, student_id, quiz_id, question_order, current_index, started_at, expires_at)
                VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)
                "#,
            )
            .bind(token)
            .bind(student.id)
            .bind(quiz_id)
            .bind(order)
            .bind(epoch())
            .bind(epoch() + Duration::minutes(30))
            .execute(app.pool())
            .await
            .unwrap();

            let result = get_session_by_token(app.pool(), token).await;
            assert!(
                matches!(result, Err(ServerError::Codec(_))),
                "{} decoded as {:?}",
                order,
                result
            );
        }
    }

    #[tokio::test]
    async fn guarded_updates_refuse_stale_writers() {
        let app = setup_app_state().await;
        let quiz_id = create_quiz(app.pool(), "Guarded", true, epoch()).await;
        let student = find_or_create_student(app.pool(), "Erin", Some("IT-E"), epoch()).await.unwrap();

        let session_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO "quiz_sessions"
                (session_token, student_id, quiz_id, question_order, current_index, started_at, expires_at)
            VALUES ('guarded', ?1, ?2, '[1,2,3]', 0, ?3, ?4)
            RETURNING id
            "#,
        )
        .bind(student.id)
        .bind(quiz_id)
        .bind(epoch())
        .bind(epoch() + Duration::minutes(30))
        .fetch_one(app.pool())
        .await
        .unwrap();

        let mut tx = app.pool().begin().await.unwrap();
        assert!(tx_advance_session(&mut tx, session_id, 0, 1).await.unwrap());
        assert!(!tx_advance_session(&mut tx, session_id, 0, 1).await.unwrap());
        assert!(tx_complete_session(&mut tx, session_id, epoch()).await.unwrap());
        assert!(!tx_complete_session(&mut tx, session_id, epoch()).await.unwrap());
        assert!(!tx_advance_session(&mut tx, session_id, 1, 2).await.unwrap());
        tx.commit().await.unwrap();

        let session = get_session_by_token(app.pool(), "guarded").await.unwrap().unwrap();
        assert_eq!(session.current_index, 1);
        assert_eq!(session.completed_at, Some(epoch()));
    }
}
