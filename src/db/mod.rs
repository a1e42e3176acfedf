use chrono::{Duration, Local, NaiveDateTime};
use sqlx::{MySqlPool, mysql::MySqlPoolOptions};

pub async fn init_db(database_url: &str) -> Result<MySqlPool, sqlx::Error> {
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            email VARCHAR(191) NOT NULL UNIQUE,
            password VARCHAR(255) NOT NULL,
            nickname VARCHAR(100) NOT NULL,
            created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
            updated_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS articles (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            title VARCHAR(255) NOT NULL,
            content TEXT NOT NULL,
            author_id BIGINT NOT NULL,
            view_count INT NOT NULL DEFAULT 0,
            created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
            updated_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
            INDEX idx_articles_author_id (author_id),
            CONSTRAINT fk_articles_author_id FOREIGN KEY (author_id) REFERENCES users(id)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    // parent_id carries no foreign key. The deletion policy keeps the
    // parent chain consistent procedurally, counting live descendants
    // before any hard delete.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            content TEXT NOT NULL,
            author_id BIGINT NOT NULL,
            article_id BIGINT NOT NULL,
            parent_id BIGINT NULL,
            path VARCHAR(512) NOT NULL DEFAULT '',
            depth INT NOT NULL DEFAULT 0,
            is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
            created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
            updated_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
            INDEX idx_comments_article_path (article_id, path(191), id),
            INDEX idx_comments_path (path(191)),
            INDEX idx_comments_author_id (author_id),
            CONSTRAINT fk_comments_author_id FOREIGN KEY (author_id) REFERENCES users(id),
            CONSTRAINT fk_comments_article_id FOREIGN KEY (article_id) REFERENCES articles(id)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS places (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            tag VARCHAR(100) NOT NULL,
            meta VARCHAR(255) NOT NULL,
            location VARCHAR(255) NOT NULL,
            description TEXT NOT NULL,
            created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            title VARCHAR(255) NOT NULL,
            place_id BIGINT NULL,
            place_name VARCHAR(255) NOT NULL,
            location VARCHAR(255) NOT NULL,
            start_at DATETIME(6) NOT NULL,
            end_at DATETIME(6) NULL,
            category VARCHAR(50) NOT NULL DEFAULT 'meetup',
            capacity INT NOT NULL DEFAULT 20,
            spot_info VARCHAR(255) NOT NULL DEFAULT '',
            description TEXT NULL,
            created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
            INDEX idx_events_start_at (start_at),
            CONSTRAINT fk_events_place_id FOREIGN KEY (place_id) REFERENCES places(id)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reservations (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            event_id BIGINT NOT NULL,
            user_id BIGINT NULL,
            status VARCHAR(50) NOT NULL DEFAULT 'confirmed',
            participant_name VARCHAR(100) NOT NULL,
            participant_email VARCHAR(255) NOT NULL,
            participant_phone VARCHAR(50) NULL,
            notes TEXT NULL,
            created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
            updated_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
            INDEX idx_reservations_event_status (event_id, status),
            INDEX idx_reservations_user_id (user_id),
            INDEX idx_reservations_participant_email (participant_email),
            CONSTRAINT fk_reservations_event_id FOREIGN KEY (event_id) REFERENCES events(id),
            CONSTRAINT fk_reservations_user_id FOREIGN KEY (user_id) REFERENCES users(id)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    seed(&pool).await?;

    Ok(pool)
}

/// Seeds the curated places and a first week of events so a fresh install
/// has something to show. Runs on every start but only writes into empty
/// tables.
async fn seed(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    let (place_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM places")
        .fetch_one(pool)
        .await?;

    if place_count == 0 {
        sqlx::query(
            r#"
            INSERT INTO places (name, tag, meta, location, description) VALUES
                ('Riverside Roastery Kitchen', 'Shared kitchen', 'Evening slots · 12 seats', 'East District',
                 'A shared kitchen by the river. Evening slots for baking and cooking classes.'),
                ('Corner Bookshop Haven', 'Indie bookstore', '3 reading circles running', 'Harbor District',
                 'A small independent bookstore. Reading circles and intimate book talks happen all week.'),
                ('Common Ground Studio', 'Studio', 'Photo · one-day classes', 'Harbor District',
                 'A multi-purpose studio hosting photo shoots and one-day classes side by side.')
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Seeded default places");
    }

    let (event_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
        .fetch_one(pool)
        .await?;

    if event_count == 0 {
        let places: Vec<(i64, String, String)> =
            sqlx::query_as("SELECT id, name, location FROM places ORDER BY id ASC LIMIT 3")
                .fetch_all(pool)
                .await?;

        let today = Local::now().naive_local().date();
        let at = |days: i64, hour: u32, minute: u32| -> NaiveDateTime {
            (today + Duration::days(days))
                .and_hms_opt(hour, minute, 0)
                .expect("valid seed time")
        };

        let seeds = [
            ("Beginner Baking Night", 0usize, at(0, 19, 30), "3 spots left"),
            ("Neighborhood Market Study", 1, at(2, 20, 30), "Free · 18 people"),
            ("Photo Walk Social", 2, at(4, 18, 30), "5 teams wanted"),
        ];

        for (title, place_index, start_at, spot_info) in seeds {
            if let Some((place_id, place_name, location)) = places.get(place_index) {
                sqlx::query(
                    r#"
                    INSERT INTO events (title, place_id, place_name, location, start_at, spot_info)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(title)
                .bind(place_id)
                .bind(place_name)
                .bind(location)
                .bind(start_at)
                .bind(spot_info)
                .execute(pool)
                .await?;
            }
        }

        tracing::info!("Seeded default events");
    }

    Ok(())
}
