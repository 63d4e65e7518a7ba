//! Offline stand-ins for provider payloads, shaped like the real responses.

use chrono::{Datelike, Duration, Local};
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::{Value, json};

const NEWS_TOPICS: [&str; 5] = ["5G", "IoT", "Cloud Computing", "Fiber Optic", "Mobile Networks"];

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Rates against USD, like exchangerate-api.com.
pub fn exchange_rates() -> Value {
    let mut rng = rand::thread_rng();
    json!({
        "base": "USD",
        "date": Local::now().format("%Y-%m-%d").to_string(),
        "rates": {
            "EUR": round_to(rng.gen_range(0.85..0.95), 4),
            "GBP": round_to(rng.gen_range(0.75..0.85), 4),
            "JPY": round_to(rng.gen_range(110.0..150.0), 2),
            "CAD": round_to(rng.gen_range(1.2..1.4), 4),
            "AUD": round_to(rng.gen_range(1.3..1.5), 4),
            "CNY": round_to(rng.gen_range(6.5..7.5), 4),
        }
    })
}

/// Current conditions, like OpenWeatherMap's `/weather`.
pub fn weather(city: &str) -> Value {
    let mut rng = rand::thread_rng();
    let main = ["Clear", "Clouds", "Rain"].choose(&mut rng).copied().unwrap_or("Clear");
    let description = ["clear sky", "few clouds", "light rain"]
        .choose(&mut rng)
        .copied()
        .unwrap_or("clear sky");
    json!({
        "name": city,
        "main": {
            "temp": round_to(rng.gen_range(15.0..30.0), 1),
            "feels_like": round_to(rng.gen_range(14.0..29.0), 1),
            "humidity": rng.gen_range(40..=80),
            "pressure": rng.gen_range(1000..=1020),
        },
        "weather": [{ "main": main, "description": description }],
        "wind": { "speed": round_to(rng.gen_range(0.0..15.0), 1) }
    })
}

/// `count` articles, like NewsAPI's `/everything`.
pub fn news_articles(count: usize) -> Value {
    let mut rng = rand::thread_rng();
    let articles: Vec<Value> = (1..=count)
        .map(|i| {
            let topic = NEWS_TOPICS.choose(&mut rng).copied().unwrap_or("5G");
            let published = Local::now() - Duration::days(rng.gen_range(0..=30));
            json!({
                "title": format!("Latest developments in {topic}"),
                "description": format!("Mock article about telecommunications industry trends #{i}"),
                "publishedAt": published.to_rfc3339(),
                "source": { "name": format!("Tech News {}", rng.gen_range(1..=10)) },
                "url": format!("https://example.com/article-{i}"),
            })
        })
        .collect();
    json!({
        "status": "ok",
        "totalResults": count,
        "articles": articles,
    })
}

/// Five years of GDP observations, newest first.
pub fn economic_indicator() -> Value {
    let mut rng = rand::thread_rng();
    let year = Local::now().year();
    let data: Vec<Value> = (0..5)
        .map(|offset| {
            json!({
                "country": "Demo Country",
                "countryiso3code": "DMO",
                "date": (year - offset).to_string(),
                "value": round_to(rng.gen_range(1e12..5e12), 2),
            })
        })
        .collect();
    json!({
        "indicator": { "id": "NY.GDP.MKTP.CD", "value": "GDP (current US$)" },
        "data": data,
    })
}
