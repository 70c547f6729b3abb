mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{ADMIN_EMAIL, Call, ad, app, titles};

#[tokio::test]
async fn plain_ad_goes_live_and_promotions_sort_first() {
    let app = app().await;
    let (_, seller) = app.register("seller@example.so").await;
    let (_, admin) = app.register(ADMIN_EMAIL).await;

    let (status, plain) = app.post_ad(&seller, ad("Plain phone", json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(plain["ad"]["status"], "approved");
    assert!(plain["payment"].is_null());

    let confirmed = json!({ "payment": { "confirmed": true } });
    let mut promoted = Vec::new();
    for (title, flags) in [
        ("Boosted phone", json!({ "boost": true })),
        ("Highlighted phone", json!({ "highlight": true })),
    ] {
        let mut body = ad(title, flags);
        body["payment"] = confirmed["payment"].clone();
        let (status, posted) = app.post_ad(&seller, body).await;
        assert_eq!(status, StatusCode::CREATED, "{}", posted);
        assert_eq!(posted["ad"]["status"], "pending");
        promoted.push(posted["ad"]["id"].as_str().unwrap().to_string());
    }

    // Pending ads stay out of the listing until approved.
    assert_eq!(app.listing_titles().await, vec!["Plain phone"]);

    for id in &promoted {
        let (status, _) = app
            .send(Call::new("POST", format!("/admin/ads/{}/approve", id)).token(&admin))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(
        app.listing_titles().await,
        vec!["Highlighted phone", "Boosted phone", "Plain phone"]
    );
}

#[tokio::test]
async fn promoted_ad_requires_confirmed_payment() {
    let app = app().await;
    let (_, seller) = app.register("promo@example.so").await;

    let (status, body) = app
        .post_ad(&seller, ad("Boost me", json!({ "boost": true, "highlight": true })))
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "PaymentRequired");
    assert_eq!(body["payment"]["payment_type"], "boost_highlight");
    assert_eq!(body["payment"]["amount"], 15.0);
    assert_eq!(body["payment"]["payment_phone"], "+254757872221");

    let (_, mine) = app.send(Call::new("GET", "/profile/ads").token(&seller)).await;
    assert!(mine.as_array().unwrap().is_empty());

    let (status, body) = app
        .post_ad(
            &seller,
            ad(
                "Boost me",
                json!({ "boost": true, "highlight": true, "payment": { "confirmed": true } }),
            ),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["ad"]["status"], "pending");
    assert_eq!(body["ad"]["is_boosted"], true);
    assert!(body["ad"]["boost_expires_at"].is_string());
    assert_eq!(body["payment"]["status"], "pending");
    assert_eq!(body["payment"]["payment_confirmed_by_user"], true);
    assert_eq!(body["payment"]["ad_id"], body["ad"]["id"]);

    assert!(app.listing_titles().await.is_empty());
}

#[tokio::test]
async fn free_user_at_limit_gets_pro_upgrade_flow() {
    let app = app().await;
    let (_, seller) = app.register("busy@example.so").await;
    for n in 1..=5 {
        let (status, _) = app.post_ad(&seller, ad(&format!("Ad {}", n), json!({}))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app.post_ad(&seller, ad("Sixth ad", json!({}))).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["payment"]["payment_type"], "pro_upgrade");
    assert_eq!(body["payment"]["amount"], 10.0);

    let (_, mine) = app.send(Call::new("GET", "/profile/ads").token(&seller)).await;
    assert_eq!(mine.as_array().unwrap().len(), 5);
    let (_, profile) = app.send(Call::new("GET", "/profile").token(&seller)).await;
    assert_eq!(profile["ad_count"], 5);

    // Confirming the upgrade lets the post through and queues the payment.
    let (status, body) = app
        .post_ad(&seller, ad("Sixth ad", json!({ "payment": { "confirmed": true } })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["payment"]["payment_type"], "pro_upgrade");
    assert!(body["payment"]["ad_id"].is_null());
    assert_eq!(body["ad"]["status"], "approved");
}

#[tokio::test]
async fn favorite_toggle_twice_leaves_nothing() {
    let app = app().await;
    let (_, seller) = app.register("fav-seller@example.so").await;
    let (_, buyer) = app.register("fav-buyer@example.so").await;
    let (_, posted) = app.post_ad(&seller, ad("Samsung A54", json!({}))).await;
    let id = posted["ad"]["id"].as_str().unwrap();

    let uri = format!("/ads/{}/favorite", id);
    let (_, first) = app.send(Call::new("POST", uri.as_str()).token(&buyer)).await;
    assert_eq!(first["favorited"], true);

    let (_, favorites) = app.send(Call::new("GET", "/favorites").token(&buyer)).await;
    assert_eq!(favorites[0]["ad"]["title"], "Samsung A54");

    let (_, second) = app.send(Call::new("POST", uri.as_str()).token(&buyer)).await;
    assert_eq!(second["favorited"], false);

    let (_, favorites) = app.send(Call::new("GET", "/favorites").token(&buyer)).await;
    assert!(favorites.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn pending_ad_engagement_is_hidden_from_strangers() {
    let app = app().await;
    let (_, seller) = app.register("quiet@example.so").await;
    let (_, stranger) = app.register("nosy@example.so").await;
    let (_, admin) = app.register(ADMIN_EMAIL).await;
    let (_, posted) = app
        .post_ad(&seller, ad("Secret", json!({ "boost": true, "payment": { "confirmed": true } })))
        .await;
    assert_eq!(posted["ad"]["status"], "pending");
    let id = posted["ad"]["id"].as_str().unwrap();

    let hidden = [
        Call::new("GET", format!("/ads/{}", id)).token(&stranger),
        Call::new("POST", format!("/ads/{}/favorite", id)).token(&stranger),
        Call::new("POST", format!("/ads/{}/comments", id))
            .token(&stranger)
            .json(json!({ "comment": "Still there?" })),
        Call::new("PUT", format!("/ads/{}/rating", id))
            .token(&stranger)
            .json(json!({ "rating": 5 })),
        Call::new("GET", format!("/ads/{}/comments", id)),
    ];
    for call in hidden {
        let (status, _) = app.send(call).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    let (_, favorites) = app.send(Call::new("GET", "/favorites").token(&stranger)).await;
    assert!(favorites.as_array().unwrap().is_empty());

    // Owner and admins still reach it.
    let (status, _) = app
        .send(
            Call::new("POST", format!("/ads/{}/comments", id))
                .token(&seller)
                .json(json!({ "comment": "Waiting for review" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, comments) = app
        .send(Call::new("GET", format!("/ads/{}/comments", id)).token(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comments.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn rating_twice_keeps_one_row_per_user() {
    let app = app().await;
    let (_, seller) = app.register("rated@example.so").await;
    let (_, first) = app.register("rater1@example.so").await;
    let (_, second) = app.register("rater2@example.so").await;
    let (_, posted) = app.post_ad(&seller, ad("iPhone 13", json!({}))).await;
    let id = posted["ad"]["id"].as_str().unwrap();
    let uri = format!("/ads/{}/rating", id);

    for (token, rating) in [(&first, 2), (&first, 4), (&second, 5)] {
        let (status, _) = app
            .send(Call::new("PUT", uri.as_str()).token(token).json(json!({ "rating": rating })))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, detail) = app.send(Call::new("GET", format!("/ads/{}", id))).await;
    assert_eq!(detail["rating"]["count"], 2);
    assert_eq!(detail["rating"]["average"], 4.5);

    let (status, _) = app
        .send(Call::new("PUT", uri.as_str()).token(&second).json(json!({ "rating": 6 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rejected_ad_never_listed() {
    let app = app().await;
    let (_, seller) = app.register("rejected@example.so").await;
    let (_, admin) = app.register(ADMIN_EMAIL).await;

    let (_, posted) = app
        .post_ad(
            &seller,
            ad(
                "Fake Rolex",
                json!({ "boost": true, "highlight": true, "payment": { "confirmed": true } }),
            ),
        )
        .await;
    let id = posted["ad"]["id"].as_str().unwrap();

    let (_, pending) = app.send(Call::new("GET", "/admin/ads/pending").token(&admin)).await;
    assert_eq!(titles(&pending), vec!["Fake Rolex"]);

    let reject = format!("/admin/ads/{}/reject", id);
    let (status, body) = app.send(Call::new("POST", reject.as_str()).token(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");

    // A second decision on the same ad loses.
    let (status, body) = app.send(Call::new("POST", reject.as_str()).token(&admin)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");

    assert!(app.listing_titles().await.is_empty());
    let (_, found) = app.send(Call::new("GET", "/search?q=rolex")).await;
    assert!(found.as_array().unwrap().is_empty());

    // Only the owner and admins can still open it.
    let detail = format!("/ads/{}", id);
    let (status, _) = app.send(Call::new("GET", detail.as_str())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.send(Call::new("GET", detail.as_str()).token(&seller)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Call::new("GET", detail.as_str()).token(&admin)).await;
    assert_eq!(status, StatusCode::OK);

    // The owner was told.
    let (_, inbox) = app.send(Call::new("GET", "/notifications").token(&seller)).await;
    assert_eq!(inbox["unread"], 1);
    assert_eq!(inbox["notifications"][0]["kind"], "ad_rejected");
}

#[tokio::test]
async fn search_filters_and_stock_toggle() {
    let app = app().await;
    let (_, seller) = app.register("search@example.so").await;
    app.post_ad(&seller, ad("Toyota Vitz", json!({ "category": "vehicles", "price": 4500.0 })))
        .await;
    app.post_ad(&seller, ad("100% cotton macawiis", json!({ "category": "fashion", "price": 15.0 })))
        .await;
    let (_, phone) = app.post_ad(&seller, ad("Tecno Spark", json!({ "price": 90.0 }))).await;

    let (_, found) = app.send(Call::new("GET", "/search?q=TOYOTA")).await;
    assert_eq!(titles(&found), vec!["Toyota Vitz"]);

    let (_, found) = app.send(Call::new("GET", "/search?q=100%25")).await;
    assert_eq!(titles(&found), vec!["100% cotton macawiis"]);

    let (_, found) = app.send(Call::new("GET", "/search?price=50-1000")).await;
    assert_eq!(titles(&found), vec!["Tecno Spark"]);

    let (_, found) = app.send(Call::new("GET", "/ads?category=vehicles")).await;
    assert_eq!(titles(&found), vec!["Toyota Vitz"]);

    let stock = format!("/ads/{}/stock", phone["ad"]["id"].as_str().unwrap());
    let (status, body) = app.send(Call::new("POST", stock.as_str()).token(&seller)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "out_of_stock");

    let (_, other) = app.register("stranger@example.so").await;
    let (status, _) = app.send(Call::new("POST", stock.as_str()).token(&other)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app.send(Call::new("POST", stock.as_str()).token(&seller)).await;
    assert_eq!(body["status"], "approved");
}

#[tokio::test]
async fn post_validation() {
    let app = app().await;
    let (_, seller) = app.register("validate@example.so").await;

    let cases = [
        ad("", json!({})),
        ad("Negative", json!({ "price": -1.0 })),
        ad("Nowhere", json!({ "region": "Atlantis" })),
        ad("Boat", json!({ "category": "boats" })),
        ad("Job", json!({ "category": "jobs" })),
        ad("Too many", json!({ "image_urls": ["a", "b", "c", "d", "e", "f"] })),
    ];
    for body in cases {
        let (status, response) = app.post_ad(&seller, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", response);
    }

    let (status, body) = app
        .post_ad(
            &seller,
            ad(
                "Driver wanted",
                json!({ "category": "jobs", "cv_url": "http://x/cv.pdf", "job_title": "Driver", "brand": "Ignored" }),
            ),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["ad"]["job_title"], "Driver");
    assert!(body["ad"]["brand"].is_null());
}
