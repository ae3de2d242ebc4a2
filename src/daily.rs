//! Day loop of one crop on one cell.

use crate::adjust::{adjust_kc, co2_adjust};
use crate::climatology::Climatology;
use crate::crop_coefficients::CropCatalog;
use crate::crop_params::{CropKind, CropParameters};
use crate::curve::{update_curve, update_height, CropCurves, CurveSettings};
use crate::error::{Result, SeasonEvent};
use crate::frost::{cold_shock, killing_frost};
use crate::gdd::{advance_cgdd, calculate_gdd};
use crate::overrides::{apply_overrides, OpenWaterEvaporation};
use crate::refet::RefEtType;
use crate::season::{longterm_start, update_season, year_rollover};
use crate::state::{CropDayState, DORMANT_KCB, MIN_HEIGHT};
use crate::weather::DailyMet;
use chrono::NaiveDate;
use tracing::debug;

/// Upper bound on the adjusted Kcb of non-water classes.
pub const MAX_KCB: f64 = 1.30;

/// Consumer of the daily Kcb series, typically a soil water balance.
pub trait SoilWaterModel {
    /// Called on the day a season starts, before that day's row is produced.
    fn setup_crop(&mut self, crop: &CropParameters, met: &DailyMet);
    /// Called once per day with the finished row.
    fn consume_day(&mut self, crop: &CropParameters, row: &DailyKcbRow);
}

/// Soil water model that ignores every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSoilWater;

impl SoilWaterModel for NoSoilWater {
    fn setup_crop(&mut self, _crop: &CropParameters, _met: &DailyMet) {}
    fn consume_day(&mut self, _crop: &CropParameters, _row: &DailyKcbRow) {}
}

/// One output row of the day loop.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyKcbRow {
    pub date: NaiveDate,
    pub doy: u32,
    /// Kcb after CO2 and climate adjustment.
    pub kcb: f64,
    /// Kcb before adjustment.
    pub kcb_noadj: f64,
    pub in_season: bool,
    pub cutting: bool,
    pub cycle: u32,
    pub height: f64, // m
    pub mad: f64,
    pub cgdd: f64,
    pub etref: Option<f64>, // mm/d
    /// Kcb times reference ET for open water classes [mm/d].
    pub water_et: Option<f64>,
}

/// The slice of the run configuration a single cell–crop needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropSettings {
    pub ref_type: RefEtType,
    pub crop_one_flag: bool,
    pub crop_one_reducer: f64,
    pub co2_flag: bool,
    /// Cuttings per season for the crop's hay type.
    pub cuttings: u32,
}

/// Cutting count of a crop: dairy hay for classes 1 and 2, beef hay for the rest.
pub fn cuttings_for(kind: CropKind, dairy_cuttings: u32, beef_cuttings: u32) -> u32 {
    match kind {
        CropKind::AlfalfaPeak | CropKind::AlfalfaDairyHay => dairy_cuttings,
        _ => beef_cuttings,
    }
}

/// Counts of season events over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeasonCounts {
    pub seasons: u32,
    pub cuttings: u32,
    pub frost_terminations: u32,
    pub harvest_terminations: u32,
    pub cgdd_terminations: u32,
    pub missing_days: u32,
}

impl SeasonCounts {
    fn record(&mut self, event: SeasonEvent) {
        match event {
            SeasonEvent::FrostTermination => self.frost_terminations += 1,
            SeasonEvent::HarvestTermination => self.harvest_terminations += 1,
            SeasonEvent::CgddTermination => self.cgdd_terminations += 1,
            SeasonEvent::Cutting => self.cuttings += 1,
        }
    }
}

/// Cell inputs shared by every crop of the cell.
#[derive(Clone, Copy)]
pub struct CellContext<'a> {
    pub cell_id: &'a str,
    pub elevation: f64,
    pub climatology: &'a Climatology,
    pub met: &'a [DailyMet],
    /// Reference ET aligned with `met`.
    pub etref: &'a [Option<f64>],
    pub lake: &'a dyn OpenWaterEvaporation,
}

/// Drives one crop through the daily weather of one cell.
pub struct CropDriver<'a> {
    cell_id: &'a str,
    crop: &'a CropParameters,
    kind: CropKind,
    curves: CropCurves<'a>,
    settings: CropSettings,
    elevation: f64,
    longterm_pl: u32,
    lake: &'a dyn OpenWaterEvaporation,
    state: CropDayState,
    last_kcb: f64,
    counts: SeasonCounts,
}

impl<'a> CropDriver<'a> {
    pub fn new(
        cell: &CellContext<'a>,
        crop: &'a CropParameters,
        catalog: &'a CropCatalog,
        settings: CropSettings,
    ) -> Result<Self> {
        let curves = CropCurves::for_crop(crop, catalog)?;
        let longterm_pl = longterm_start(crop, cell.climatology);
        debug!(cell_id = cell.cell_id, class = crop.class_number, longterm_pl, "initialized crop");
        Ok(CropDriver {
            cell_id: cell.cell_id,
            crop,
            kind: crop.kind(),
            curves,
            settings,
            elevation: cell.elevation,
            longterm_pl,
            lake: cell.lake,
            state: CropDayState::new(crop),
            last_kcb: DORMANT_KCB,
            counts: SeasonCounts::default(),
        })
    }

    pub fn state(&self) -> &CropDayState {
        &self.state
    }

    pub fn counts(&self) -> &SeasonCounts {
        &self.counts
    }

    fn record(&mut self, event: SeasonEvent, date: NaiveDate) {
        debug!(
            cell_id = self.cell_id,
            class = self.crop.class_number,
            %date,
            ?event,
            cycle = self.state.cycle,
            "season event"
        );
        self.counts.record(event);
    }

    fn adjusts_for_climate(&self) -> bool {
        !self.kind.is_winter_cover() && !self.kind.is_open_water()
    }

    fn row(&self, met: &DailyMet, kcb: f64, etref: Option<f64>) -> DailyKcbRow {
        let water_et = if self.kind.is_open_water() {
            etref.map(|et| kcb * et)
        } else {
            None
        };
        DailyKcbRow {
            date: met.date,
            doy: met.doy,
            kcb,
            kcb_noadj: self.state.kc_bas,
            in_season: self.state.in_season,
            cutting: self.state.cutting,
            cycle: self.state.cycle,
            height: self.state.height,
            mad: self.state.mad,
            cgdd: self.state.cgdd,
            etref,
            water_et,
        }
    }

    /// Advances the crop by one day.
    ///
    /// Order: GDD, season trigger, Kcb curve, cold shock, killing frost, dormant values, winter cover and open water
    /// overrides, then CO2 and climate adjustment. A day whose temperatures (or, for ETo-based runs, wind and
    /// humidity) are missing carries yesterday's Kcb; only the new-year rollover is applied to the state.
    pub fn step(
        &mut self,
        met: &DailyMet,
        etref: Option<f64>,
        soil: &mut dyn SoilWaterModel,
    ) -> Result<DailyKcbRow> {
        let crop = self.crop;
        self.state.cutting = false;

        let climate_adjusted =
            self.settings.ref_type == RefEtType::Eto && self.adjusts_for_climate();
        let missing = !met.tmax.is_finite()
            || !met.tmin.is_finite()
            || (climate_adjusted && (!met.u2.is_finite() || !met.rh_min.is_finite()));
        if missing {
            // The new year still begins on a missing trigger day
            if year_rollover(&mut self.state, crop, met.doy) {
                self.state.cgdd = 0.0;
            }
            self.counts.missing_days += 1;
            debug!(
                cell_id = self.cell_id,
                class = crop.class_number,
                date = %met.date,
                "missing input, carrying previous Kcb"
            );
            let row = self.row(met, self.last_kcb, etref);
            soil.consume_day(crop, &row);
            return Ok(row);
        }

        let gdd = calculate_gdd(met.tmax, met.tmin, crop.gdd_base_c, crop.gdd_max_c);
        self.state.cgdd = advance_cgdd(self.state.cgdd, gdd, met.doy, crop.gdd_trigger_doy);

        if update_season(&mut self.state, crop, met, self.longterm_pl) {
            self.counts.seasons += 1;
            debug!(
                cell_id = self.cell_id,
                class = crop.class_number,
                date = %met.date,
                doy_start_cycle = self.state.doy_start_cycle,
                "season started"
            );
            soil.setup_crop(crop, met);
        }

        if self.state.in_season {
            let curve_settings = CurveSettings {
                crop_one_flag: self.settings.crop_one_flag,
                crop_one_reducer: self.settings.crop_one_reducer,
                cuttings: self.settings.cuttings,
            };
            let event = update_curve(
                &mut self.state,
                crop,
                &self.curves,
                &curve_settings,
                met,
                self.cell_id,
            )?;
            if let Some(event) = event {
                self.record(event, met.date);
            }
            let curve = self.curves.for_cycle(self.state.cycle, self.settings.cuttings);
            update_height(&mut self.state, crop, curve);
        }

        cold_shock(&mut self.state, crop, met);
        if let Some(event) = killing_frost(&mut self.state, crop, met) {
            self.record(event, met.date);
        }

        if !self.state.in_season {
            self.state.kc_bas = DORMANT_KCB;
            self.state.mad = crop.mad_initial;
            self.state.height = crop.height_min.max(MIN_HEIGHT);
        }

        apply_overrides(
            &mut self.state,
            self.kind,
            self.settings.ref_type,
            met,
            etref,
            self.elevation,
            self.lake,
        );
        if !self.kind.is_open_water() {
            self.state.kc_bas = self.state.kc_bas.max(DORMANT_KCB);
        }
        self.state.height = self.state.height.max(MIN_HEIGHT);
        self.state.kc_bas_prev = self.state.kc_bas;

        let mut kcb = self.state.kc_bas;
        if self.adjusts_for_climate() {
            if self.settings.co2_flag {
                kcb = co2_adjust(kcb, crop.co2_family, met.co2.as_ref());
            }
            if self.settings.ref_type == RefEtType::Eto {
                kcb = adjust_kc(kcb, met.u2, met.rh_min, self.state.height);
            }
        }
        if !self.kind.is_open_water() {
            kcb = kcb.clamp(DORMANT_KCB, MAX_KCB);
        }
        self.last_kcb = kcb;
        self.state.first_day = false;

        let row = self.row(met, kcb, etref);
        soil.consume_day(crop, &row);
        Ok(row)
    }
}

/// Runs the whole weather series of a cell through one crop.
///
/// # Returns
///
/// One row per day and the season event counts.
pub fn run_crop(
    cell: &CellContext,
    crop: &CropParameters,
    catalog: &CropCatalog,
    settings: CropSettings,
    soil: &mut dyn SoilWaterModel,
) -> Result<(Vec<DailyKcbRow>, SeasonCounts)> {
    let mut driver = CropDriver::new(cell, crop, catalog, settings)?;
    let mut rows = Vec::with_capacity(cell.met.len());
    for (i, met) in cell.met.iter().enumerate() {
        let etref = cell.etref.get(i).copied().flatten();
        rows.push(driver.step(met, etref, soil)?);
    }
    Ok((rows, *driver.counts()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climatology::MonthlyClimatology;
    use crate::fixtures;
    use crate::overrides::AerodynamicLake;
    use approx::assert_abs_diff_eq;
    use chrono::Datelike;

    fn settings(ref_type: RefEtType) -> CropSettings {
        CropSettings {
            ref_type,
            crop_one_flag: true,
            crop_one_reducer: 0.9,
            co2_flag: false,
            cuttings: 4,
        }
    }

    /// A year of weather with a seasonal temperature wave.
    fn year_weather(year: i32) -> Vec<DailyMet> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
        start
            .iter_days()
            .take_while(|d| d.year() == year)
            .map(|d| {
                let doy = d.ordinal() as f64;
                let tmean = 10.0 - 15.0 * ((doy - 15.0) * 2.0 * std::f64::consts::PI / 365.0).cos();
                let mut met = fixtures::met(d, tmean + 7.0, tmean - 7.0);
                met.t30 = tmean;
                met.u2 = 3.0;
                met.rh_min = 30.0;
                met
            })
            .collect()
    }

    fn climatology_of(met: &[DailyMet]) -> Climatology {
        let dates: Vec<NaiveDate> = met.iter().map(|m| m.date).collect();
        let tmax: Vec<f64> = met.iter().map(|m| m.tmax).collect();
        let tmin: Vec<f64> = met.iter().map(|m| m.tmin).collect();
        let monthly = MonthlyClimatology::from_series(&dates, &tmax, &tmin, &tmin, &tmin);
        Climatology::new(monthly, &dates, &tmax, &tmin)
    }

    fn run(class: u32, ref_type: RefEtType, met: &[DailyMet]) -> Vec<DailyKcbRow> {
        let catalog = fixtures::catalog();
        let climatology = climatology_of(met);
        let etref: Vec<Option<f64>> = met.iter().map(|_| Some(5.0)).collect();
        let cell = CellContext {
            cell_id: "c1",
            elevation: 1000.0,
            climatology: &climatology,
            met,
            etref: &etref,
            lake: &AerodynamicLake,
        };
        let crop = catalog.crop(class).unwrap();
        run_crop(&cell, crop, &catalog, settings(ref_type), &mut NoSoilWater)
            .unwrap()
            .0
    }

    #[test]
    // S1: bare soil is in season with Kcb 0.1 every day
    fn test_bare_soil_all_year() {
        let met = year_weather(2001);
        for class in [44, 45, 46] {
            let rows = run(class, RefEtType::Eto, &met);
            assert_eq!(rows.len(), 365);
            for row in &rows {
                assert!(row.in_season);
                assert!(!row.cutting);
                assert_abs_diff_eq!(row.kcb, 0.1, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_kcb_bounds_and_single_start() {
        let met = year_weather(2001);
        for class in [1, 2, 3, 7, 11, 13, 47, 48] {
            let rows = run(class, RefEtType::Eto, &met);
            for row in &rows {
                assert!(row.kcb >= 0.1 - 1e-12 && row.kcb <= MAX_KCB + 1e-12, "class {class} kcb {}", row.kcb);
            }
            let starts = rows
                .windows(2)
                .filter(|w| !w[0].in_season && w[1].in_season)
                .count();
            assert!(starts <= 1, "class {class} started {starts} times");
        }
    }

    #[test]
    // Cumulative GDD never decreases within the year and resets on January 1
    fn test_cgdd_monotonic() {
        let mut met = year_weather(2001);
        met.extend(year_weather(2002));
        let rows = run(7, RefEtType::Eto, &met);
        for w in rows.windows(2) {
            if w[1].doy == 1 {
                assert_eq!(w[1].cgdd, 0.0);
            } else {
                assert!(w[1].cgdd >= w[0].cgdd);
            }
        }
    }

    #[test]
    // Corn greens up in spring, ramps from the first curve value, and ends by autumn
    fn test_corn_season() {
        let met = year_weather(2001);
        let rows = run(7, RefEtType::Etr, &met);
        let first = rows.iter().position(|r| r.in_season).unwrap();
        assert!(rows[first].doy > 60 && rows[first].doy < 200);
        assert!(rows[first].kcb < 0.3);
        let peak = rows.iter().map(|r| r.kcb).fold(0.0, f64::max);
        assert_abs_diff_eq!(peak, 1.05, epsilon = 1e-9);
        assert!(!rows.last().unwrap().in_season);
    }

    #[test]
    fn test_alfalfa_cuts_match_cycles() {
        let met = year_weather(2001);
        let rows = run(2, RefEtType::Etr, &met);
        let cuttings = rows.iter().filter(|r| r.cutting).count() as u32;
        assert!(cuttings >= 1);
        let max_cycle = rows.iter().map(|r| r.cycle).max().unwrap();
        assert_eq!(cuttings, max_cycle - 1);
    }

    #[test]
    // ETr runs bypass the climate correction
    fn test_etr_ignores_wind_and_humidity() {
        let met = year_weather(2001);
        let reference: Vec<DailyMet> = met
            .iter()
            .map(|m| {
                let mut m = *m;
                m.u2 = 2.0;
                m.rh_min = 45.0;
                m
            })
            .collect();
        let a = run(7, RefEtType::Etr, &met);
        let b = run(7, RefEtType::Etr, &reference);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.kcb, y.kcb);
        }
        // ETo runs do adjust in a dry, windy climate
        let c = run(7, RefEtType::Eto, &met);
        assert!(c.iter().zip(&a).any(|(x, y)| x.kcb > y.kcb));
    }

    #[test]
    fn test_run_is_deterministic() {
        let met = year_weather(2001);
        assert_eq!(run(13, RefEtType::Eto, &met), run(13, RefEtType::Eto, &met));
    }

    #[test]
    fn test_missing_day_carries_kcb() {
        let mut met = year_weather(2001);
        met[200].tmax = f64::NAN;
        let rows = run(7, RefEtType::Eto, &met);
        assert_eq!(rows[200].kcb, rows[199].kcb);
        assert_eq!(rows[200].cgdd, rows[199].cgdd);
    }

    #[test]
    // A missing January 1 still resets the cumulative GDD and re-arms the season trigger
    fn test_missing_new_year_day_resets_cgdd() {
        let mut met = year_weather(2001);
        met.extend(year_weather(2002));
        met[365].tmax = f64::NAN;
        let rows = run(7, RefEtType::Etr, &met);
        assert!(rows[364].cgdd > 1000.0);
        assert_eq!(rows[365].cgdd, 0.0);
        assert!(!rows[365].in_season);
        assert!(rows[366].cgdd < 50.0);
        let starts = rows
            .windows(2)
            .filter(|w| !w[0].in_season && w[1].in_season)
            .count();
        assert_eq!(starts, 2);
    }

    #[test]
    fn test_open_water_et() {
        let met = year_weather(2001);
        let rows = run(55, RefEtType::Eto, &met);
        assert_abs_diff_eq!(rows[100].kcb, 1.05, epsilon = 1e-12);
        assert_abs_diff_eq!(rows[100].water_et.unwrap(), 5.25, epsilon = 1e-12);
        let rows = run(7, RefEtType::Eto, &met);
        assert!(rows[100].water_et.is_none());
    }

    #[test]
    // S6: corn killed by frost on DOY 280 is dormant the next day
    fn test_killing_frost_in_day_loop() {
        let mut met = year_weather(2001);
        for m in met.iter_mut() {
            m.tmax = 30.0;
            m.tmin = 15.0;
        }
        met[279].tmin = -3.0;
        let catalog = fixtures::catalog();
        let climatology = climatology_of(&met);
        let etref = vec![Some(5.0); met.len()];
        let cell = CellContext {
            cell_id: "c1",
            elevation: 1000.0,
            climatology: &climatology,
            met: &met,
            etref: &etref,
            lake: &AerodynamicLake,
        };
        let mut corn = catalog.crop(7).unwrap().clone();
        // Keep the crop alive past early autumn
        corn.cgdd_for_termination = 10000.0;
        let mut driver = CropDriver::new(&cell, &corn, &catalog, settings(RefEtType::Etr)).unwrap();
        let mut rows = Vec::new();
        for (m, e) in met.iter().zip(&etref) {
            rows.push(driver.step(m, *e, &mut NoSoilWater).unwrap());
        }
        assert!(rows[278].in_season);
        assert!(!rows[279].in_season);
        assert_abs_diff_eq!(rows[280].kcb, 0.1, epsilon = 1e-12);
        assert_eq!(driver.counts().frost_terminations, 1);
    }

    struct CountingSoil {
        setups: u32,
        days: u32,
    }

    impl SoilWaterModel for CountingSoil {
        fn setup_crop(&mut self, _crop: &CropParameters, _met: &DailyMet) {
            self.setups += 1;
        }
        fn consume_day(&mut self, _crop: &CropParameters, _row: &DailyKcbRow) {
            self.days += 1;
        }
    }

    #[test]
    fn test_soil_water_hooks() {
        let met = year_weather(2001);
        let catalog = fixtures::catalog();
        let climatology = climatology_of(&met);
        let etref = vec![Some(5.0); met.len()];
        let cell = CellContext {
            cell_id: "c1",
            elevation: 1000.0,
            climatology: &climatology,
            met: &met,
            etref: &etref,
            lake: &AerodynamicLake,
        };
        let mut soil = CountingSoil { setups: 0, days: 0 };
        let (_, counts) = run_crop(&cell, catalog.crop(11).unwrap(), &catalog, settings(RefEtType::Eto), &mut soil).unwrap();
        assert_eq!(soil.setups, 1);
        assert_eq!(soil.days, 365);
        assert_eq!(counts.seasons, 1);
    }

    #[test]
    fn test_cuttings_for() {
        assert_eq!(cuttings_for(CropKind::AlfalfaDairyHay, 5, 3), 5);
        assert_eq!(cuttings_for(CropKind::AlfalfaPeak, 5, 3), 5);
        assert_eq!(cuttings_for(CropKind::AlfalfaBeefHay, 5, 3), 3);
    }
}
