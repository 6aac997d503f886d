use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::{
    Config, Result,
    model::{HourKey, HourRecord},
    render::{Strip, StripRenderer},
    source::{DocumentSource, SourceId, source_from_config},
    timeline::Timeline,
};

/// Fetch → parse → merge → render, owned end to end by one invocation.
///
/// Sources are fetched one after the other, telemetry first, and the whole run
/// fails on the first fatal error; there is no partial image.
#[derive(Debug)]
pub struct Pipeline {
    telemetry: Box<dyn DocumentSource>,
    forecast: Box<dyn DocumentSource>,
    renderer: StripRenderer,
}

impl Pipeline {
    pub fn new(
        telemetry: Box<dyn DocumentSource>,
        forecast: Box<dyn DocumentSource>,
        renderer: StripRenderer,
    ) -> Self {
        Self { telemetry, forecast, renderer }
    }

    /// Build a pipeline that fetches both documents over HTTP.
    pub fn from_config(config: &Config) -> Result<Self> {
        let tz = config.location.tz()?;
        info!(
            location = %config.location.name,
            timezone = %tz,
            snow_line_ft = config.render.snow_line_ft().round(),
            "configured pipeline"
        );
        Ok(Self::new(
            source_from_config(SourceId::Telemetry, &config.sources)?,
            source_from_config(SourceId::Forecast, &config.sources)?,
            StripRenderer::new(config.render.clone(), tz)?,
        ))
    }

    /// Swap the telemetry source, e.g. for a saved document.
    pub fn with_telemetry(mut self, source: Box<dyn DocumentSource>) -> Self {
        self.telemetry = source;
        self
    }

    pub fn with_forecast(mut self, source: Box<dyn DocumentSource>) -> Self {
        self.forecast = source;
        self
    }

    pub fn tz(&self) -> Tz {
        self.renderer.tz()
    }

    fn source(&self, id: SourceId) -> &dyn DocumentSource {
        match id {
            SourceId::Telemetry => self.telemetry.as_ref(),
            SourceId::Forecast => self.forecast.as_ref(),
        }
    }

    /// Fetch and parse a single source.
    pub async fn fetch_partials(&self, id: SourceId) -> Result<Vec<(HourKey, HourRecord)>> {
        let source = self.source(id);
        let data = source.fetch().await?;
        let partials = source.id().parse(&data, self.tz())?;
        debug!(source = %id, partials = partials.len(), "parsed document");
        Ok(partials)
    }

    /// Fetch and parse both sources into a merged timeline.
    pub async fn build_timeline(&self) -> Result<Timeline> {
        self.build_timeline_from(SourceId::all()).await
    }

    /// Merge only the given sources, in order.
    pub async fn build_timeline_from(&self, ids: &[SourceId]) -> Result<Timeline> {
        let mut timeline = Timeline::new();

        for &id in ids {
            timeline.extend(self.fetch_partials(id).await?);
        }

        if timeline.is_empty() {
            warn!(sources = ?ids, "sources produced no hourly records");
        }

        info!(
            hours = timeline.len(),
            first = ?timeline.first_hour().map(|h| h.to_rfc3339()),
            last = ?timeline.last_hour().map(|h| h.to_rfc3339()),
            "built timeline"
        );

        Ok(timeline)
    }

    pub async fn render<T: TimeZone>(&self, now: &DateTime<T>) -> Result<Strip> {
        let timeline = self.build_timeline().await?;
        self.renderer.render(&timeline, now)
    }

    /// Render and encode as PNG.
    pub async fn render_png<T: TimeZone>(&self, now: &DateTime<T>) -> Result<Vec<u8>> {
        let strip = self.render(now).await?;
        strip.bitmap.encode_png()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        StripError,
        config::RenderConfig,
        render::Branch,
        source::FileSource,
    };
    use chrono::Utc;
    use chrono_tz::America::Los_Angeles;
    use std::path::Path;

    // Four hourly depth samples stamped 09:00-12:00 PST (17:00-20:00Z), covering
    // 08:00-11:00 local, followed by one inch of forecast snow at 12:00 local.
    const TELEMETRY: &str = r#"{
        "STATION": [{
            "STID": "TEST1",
            "OBSERVATIONS": {
                "date_time": [
                    "2024-01-10T17:00:00Z",
                    "2024-01-10T18:00:00Z",
                    "2024-01-10T19:00:00Z",
                    "2024-01-10T20:00:00Z"
                ],
                "snow_depth_set_1": [10.0, 10.5, 10.3, 11.0],
                "air_temp_set_1": [27.0, 28.0, 29.0, 30.0],
                "precip_accum_one_hour_set_1": [0.0, 0.05, 0.0, 0.07]
            }
        }]
    }"#;

    const FORECAST: &str = r#"{
        "properties": {
            "snowfallAmount": {
                "uom": "wmoUnit:mm",
                "values": [{"validTime": "2024-01-10T20:00:00+00:00/PT1H", "value": 25.4}]
            },
            "snowLevel": {
                "uom": "wmoUnit:m",
                "values": [{"validTime": "2024-01-10T20:00:00+00:00/PT6H", "value": 600.0}]
            },
            "temperature": {
                "uom": "wmoUnit:degC",
                "values": [{"validTime": "2024-01-10T20:00:00+00:00/PT6H", "value": -3.0}]
            }
        }
    }"#;

    fn write(dir: &Path, name: &str, body: &str) -> Box<dyn DocumentSource> {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        let id = if name.starts_with("telemetry") { SourceId::Telemetry } else { SourceId::Forecast };
        Box::new(FileSource::new(id, path))
    }

    fn pipeline(dir: &Path, telemetry: &str, forecast: &str) -> Pipeline {
        Pipeline::new(
            write(dir, "telemetry.json", telemetry),
            write(dir, "forecast.json", forecast),
            StripRenderer::new(RenderConfig::default(), Los_Angeles).unwrap(),
        )
    }

    fn noon() -> DateTime<Utc> {
        Los_Angeles.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap().with_timezone(&Utc)
    }

    fn la(hour: u32) -> chrono::DateTime<Tz> {
        Los_Angeles.with_ymd_and_hms(2024, 1, 10, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn merges_both_sources_into_one_timeline() {
        let dir = tempfile::tempdir().unwrap();
        let timeline = pipeline(dir.path(), TELEMETRY, FORECAST).build_timeline().await.unwrap();

        // 08..=11 observed, 12..=17 forecast
        assert_eq!(timeline.len(), 10);

        let last_observed = timeline.get(&la(11)).unwrap();
        assert_eq!(last_observed.observed_snow, Some(11.0));
        assert_eq!(last_observed.predicted_temp, None);

        let first_forecast = timeline.get(&la(12)).unwrap();
        assert_eq!(first_forecast.predicted_snow, Some(1.0));
        assert_eq!(first_forecast.predicted_snow_level, Some(600.0));
        assert!((first_forecast.predicted_temp.unwrap() - 26.6).abs() < 1e-9);
        assert_eq!(first_forecast.observed_snow, None);
    }

    #[tokio::test]
    async fn end_to_end_accumulation() {
        let dir = tempfile::tempdir().unwrap();
        let strip = pipeline(dir.path(), TELEMETRY, FORECAST).render(&noon()).await.unwrap();

        let totals: Vec<f64> =
            (8..=11).map(|h| strip.trace_at(&la(h)).unwrap().total).collect();
        assert_eq!(totals, vec![0.0, 0.5, 0.5, 1.0]);

        let first_future = strip.trace_at(&la(12)).unwrap();
        assert_eq!(first_future.branch, Branch::Future);
        assert!((first_future.total - 2.0).abs() < 1e-12);

        // two inches fill the bottom two rows of the "now" column
        let palette = &RenderConfig::default().palette;
        let col = first_future.column;
        assert_eq!(strip.bitmap.cell_color(col, 15), palette.future_day);
        assert_eq!(strip.bitmap.cell_color(col, 14), palette.future_day);
        assert_eq!(strip.bitmap.cell_color(col, 13), palette.tick);
    }

    #[tokio::test]
    async fn render_png_produces_full_size_image() {
        let dir = tempfile::tempdir().unwrap();
        let png = pipeline(dir.path(), TELEMETRY, FORECAST).render_png(&noon()).await.unwrap();

        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        // IHDR width/height, big-endian
        assert_eq!(u32::from_be_bytes(png[16..20].try_into().unwrap()), 1089);
        assert_eq!(u32::from_be_bytes(png[20..24].try_into().unwrap()), 273);
    }

    #[tokio::test]
    async fn telemetry_without_stations_aborts_the_render() {
        let dir = tempfile::tempdir().unwrap();
        let err = pipeline(dir.path(), r#"{"STATION":[]}"#, FORECAST)
            .render(&noon())
            .await
            .unwrap_err();

        assert!(matches!(err, StripError::NoStations));
    }

    #[tokio::test]
    async fn single_source_timeline() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path(), TELEMETRY, FORECAST);

        let observed = pipeline.build_timeline_from(&[SourceId::Telemetry]).await.unwrap();
        assert_eq!(observed.len(), 4);
        assert!(observed.iter().all(|(_, r)| r.predicted_temp.is_none()));

        let forecast = pipeline.build_timeline_from(&[SourceId::Forecast]).await.unwrap();
        assert_eq!(forecast.len(), 6);
        assert_eq!(forecast.first_hour(), Some(la(12)));

        assert!(pipeline.build_timeline_from(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn source_overrides_replace_http_sources() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::from_config(&Config::default())
            .unwrap()
            .with_telemetry(write(dir.path(), "telemetry.json", TELEMETRY))
            .with_forecast(write(dir.path(), "forecast.json", FORECAST));

        let timeline = pipeline.build_timeline().await.unwrap();
        assert_eq!(timeline.len(), 10);
    }
}
