//! Accessory against an HTTP receiver stand-in

use std::sync::Arc;
use std::time::Duration;

use mockito::Server;
use receiver_client::ReceiverClient;
use urri_volume::testing::RecordingAdapter;
use urri_volume::{AccessoryConfig, Characteristic, CharacteristicValue, VolumeAccessory};

fn accessory(server: &Server, adapter: Arc<RecordingAdapter>) -> VolumeAccessory {
    let config = AccessoryConfig::new("HTTP Receiver")
        .with_default_volume(15)
        .with_refresh_interval(Duration::from_secs(3600));
    let client = ReceiverClient::with_base_url(server.url());

    VolumeAccessory::new(config, Arc::new(client), adapter).expect("valid config")
}

#[tokio::test]
async fn test_switch_on_sends_default_volume() {
    let mut server = Server::new_async().await;
    let set = server
        .mock("POST", "/setVolume/15")
        .with_status(200)
        .with_body("OK")
        .expect(1)
        .create_async()
        .await;

    let adapter = Arc::new(RecordingAdapter::new());
    let accessory = accessory(&server, adapter.clone());

    accessory.set_on(true).await.unwrap();
    set.assert_async().await;
    assert_eq!(accessory.get_brightness(), 15);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        adapter.last_value(Characteristic::Brightness),
        Some(CharacteristicValue::Brightness(15))
    );

    accessory.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_refresh_reads_volume() {
    let mut server = Server::new_async().await;
    let get = server
        .mock("POST", "/getVolume")
        .with_status(200)
        .with_body("42")
        .create_async()
        .await;

    let adapter = Arc::new(RecordingAdapter::new());
    let accessory = accessory(&server, adapter.clone());

    accessory.refresh();
    for _ in 0..50 {
        if accessory.get_brightness() == 42 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    get.assert_async().await;
    assert_eq!(accessory.get_brightness(), 42);
    assert!(accessory.state().is_on());

    accessory.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unreachable_receiver_serves_cache() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let adapter = Arc::new(RecordingAdapter::new());
    let config = AccessoryConfig::new("Offline").with_refresh_interval(Duration::from_secs(3600));
    let client = ReceiverClient::with_base_url(format!("http://127.0.0.1:{}", port));
    let accessory = VolumeAccessory::new(config, Arc::new(client), adapter.clone()).unwrap();

    assert!(!accessory.get_on().await);
    assert_eq!(adapter.error_count(Characteristic::On), 1);
    assert!(accessory.set_brightness(30).await.is_err());
    assert_eq!(accessory.get_brightness(), 0);

    accessory.shutdown().await.unwrap();
}
