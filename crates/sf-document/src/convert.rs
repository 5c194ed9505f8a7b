//! Conversion between documents and typed networks.

use crate::fields::{FieldReader, Fields};
use crate::schema::{ConnectionDef, Document, ElementDef, PortDef};
use crate::{DocumentError, DocumentResult, LATEST_VERSION};
use serde_json::{Value, json};
use sf_controls::GovernorParams;
use sf_core::units::{kgm2, m, m2, m3ps, mps, rpm, s, to_rpm};
use sf_elements::{
    Element, ElementKind, Manifold, OpeningSchedule, Pipe, Reservoir, RunnerType, SurgeTank,
    Turbine, Valve,
};
use sf_network::{Network, NetworkBuilder, Port, ValidationError};
use std::collections::BTreeMap;
use tracing::debug;

impl From<PortDef> for Port {
    fn from(p: PortDef) -> Self {
        match p {
            PortDef::Inlet => Port::Inlet,
            PortDef::Outlet => Port::Outlet,
        }
    }
}

impl From<Port> for PortDef {
    fn from(p: Port) -> Self {
        match p {
            Port::Inlet => PortDef::Inlet,
            Port::Outlet => PortDef::Outlet,
        }
    }
}

/// Build and validate the network described by `doc`.
pub fn to_network(doc: &Document) -> DocumentResult<Network> {
    let network = build_network(doc)?;
    network.validate()?;
    debug!(
        name = %doc.name,
        elements = network.elements().len(),
        connections = network.connections().len(),
        "document converted"
    );
    Ok(network)
}

/// Type the document's elements and connections without the structural
/// checks, so callers can collect [`Network::validation_report`].
pub fn build_network(doc: &Document) -> DocumentResult<Network> {
    if doc.version != LATEST_VERSION {
        return Err(DocumentError::Migration {
            what: format!(
                "document version {} must be migrated to {LATEST_VERSION} first",
                doc.version
            ),
        });
    }

    let by_name: BTreeMap<&str, &ElementDef> =
        doc.elements.iter().map(|e| (e.name.as_str(), e)).collect();
    let mut builder = NetworkBuilder::new();
    for def in &doc.elements {
        let element = element_from_def(def, &by_name)?;
        builder.add_element_at(def.name.clone(), element, [def.x, def.y]);
    }
    for c in &doc.connections {
        builder.connect_names(&c.from, c.from_port.into(), &c.to, c.to_port.into())?;
    }
    Ok(builder.build()?)
}

fn element_from_def<'a>(
    def: &'a ElementDef,
    by_name: &BTreeMap<&str, &'a ElementDef>,
) -> DocumentResult<Element> {
    let kind: ElementKind = def.class.parse().map_err(|_| DocumentError::UnknownClass {
        element: def.name.clone(),
        class: def.class.clone(),
    })?;
    let name = def.name.as_str();
    let mut r = FieldReader::new(name, &def.fields);

    let element = match kind {
        ElementKind::InletReservoir => {
            let level = r.required("level_h")?;
            let invert = r.or("pipe_z", 0.0)?;
            Element::InletReservoir(Reservoir::new(m(level), m(invert)))
        }
        ElementKind::OutletReservoir => {
            let level = r.required("level_h")?;
            let invert = r.or("level_z", 0.0)?;
            Element::OutletReservoir(Reservoir::new(m(level), m(invert)))
        }
        ElementKind::Pipe => {
            let source = source_pipe(&mut r, by_name)?;
            let mut r = r.with_fallback(source);
            let pipe = read_pipe(&mut r)?;
            r.finish()?;
            return Ok(Element::Pipe(pipe));
        }
        ElementKind::Valve => Element::Valve(Valve {
            diameter: m(r.required("diameter")?),
            loss_coefficient: r.required("loss_coefficient")?,
            loss_exponent: r.required("loss_factor")?,
            elevation: m(r.or("elevation_z", 0.0)?),
            opening_schedule: OpeningSchedule::new(r.pairs("custom_values")?),
        }),
        ElementKind::Manifold => Element::Manifold(Manifold::new(m(r.or("elev_z", 0.0)?))),
        ElementKind::SurgeTank => Element::SurgeTank(SurgeTank {
            throttle_area: m2(r.required("throttle_ao")?),
            tank_area: m2(r.required("stank_a")?),
            throttle_k_in: r.required("throttle_kin")?,
            throttle_k_out: r.required("throttle_kout")?,
            base_elevation: m(r.required("throttle_el_zo")?),
        }),
        ElementKind::Turbine => {
            let governor = match r.object("governor")? {
                Some(fields) => read_governor(name, &fields)?,
                None => governor_defaults(),
            };
            let runner = match r.text("select")? {
                Some(text) => text
                    .parse::<RunnerType>()
                    .map_err(|e| r.invalid("select", e.to_string()))?,
                None => RunnerType::default(),
            };
            Element::Turbine(Turbine {
                rated_head: m(r.required("ho")?),
                rated_flow: m3ps(r.required("qo")?),
                rated_diameter: m(r.required("do")?),
                rated_speed: rpm(r.required("no")?),
                inertia: kgm2(r.required("jn")?),
                efficiency: r.or("efficiency_np", 0.9)?,
                elevation: m(r.or("z_elev", 0.0)?),
                runner,
                governor,
            })
        }
    };
    r.finish()?;
    Ok(element)
}

/// Fields of the pipe named by `source_pipe`, if set.
fn source_pipe<'a>(
    r: &mut FieldReader<'a>,
    by_name: &BTreeMap<&str, &'a ElementDef>,
) -> DocumentResult<Option<&'a Fields>> {
    let Some(source) = r.text("source_pipe")? else {
        return Ok(None);
    };
    match by_name.get(source) {
        Some(def) if def.class == ElementKind::Pipe.as_str() => Ok(Some(&def.fields)),
        _ => Err(r
            .invalid("source_pipe", format!("'{source}' is not a pipe"))
            .into()),
    }
}

fn read_pipe(r: &mut FieldReader<'_>) -> Result<Pipe, ValidationError> {
    Ok(Pipe {
        diameter: m(r.required("diameter")?),
        length: m(r.required("length")?),
        wave_celerity: mps(r.required("celerity")?),
        manning_n: r.required("manning_n")?,
        reaches: r.count("nodes_n")?,
        initial_head: m(r.required("inlet_h1")?),
        initial_flow: m3ps(r.required("inlet_q1")?),
        dt_max: r.number("dt_max")?.filter(|&t| t != 0.0).map(s),
    })
}

/// Governor settings for blank document fields: a full load rejection ramped over 0.1 s.
fn governor_defaults() -> GovernorParams {
    GovernorParams {
        load_rejection_fraction: -1.0,
        ramp_time_s: 0.1,
        ..GovernorParams::default()
    }
}

fn read_governor(element: &str, fields: &Fields) -> Result<GovernorParams, ValidationError> {
    let defaults = governor_defaults();
    let mut g = FieldReader::nested(element, fields, "governor.");
    let params = GovernorParams {
        load_rejection_fraction: g.or("delta_p", defaults.load_rejection_fraction * 100.0)?
            / 100.0,
        rejection_time_s: g.or("t_load_rej", defaults.rejection_time_s)?,
        ramp_time_s: g.or("dt_ramp", defaults.ramp_time_s)?,
        tg_s: g.or("tg", defaults.tg_s)?,
        td_s: g.or("td", defaults.td_s)?,
        tr_s: g.or("tr", defaults.tr_s)?,
        bp: g.or("bp", defaults.bp)?,
        kp: g.or("kp", defaults.kp)?,
        gate_rate_limit: g.or("gate_rate_limit", defaults.gate_rate_limit)?,
    };
    g.finish()?;
    Ok(params)
}

/// Document describing `network`; numbers are written as JSON numbers.
pub fn from_network(network: &Network, name: &str) -> Document {
    let elements = network
        .elements()
        .iter()
        .map(|ne| ElementDef {
            class: ne.kind().as_str().to_string(),
            name: ne.name.clone(),
            x: ne.position[0],
            y: ne.position[1],
            fields: element_fields(&ne.element),
        })
        .collect();
    let connections = network
        .connections()
        .iter()
        .map(|c| ConnectionDef {
            from: network.name_of(c.from),
            to: network.name_of(c.to),
            from_port: c.from_port.into(),
            to_port: c.to_port.into(),
        })
        .collect();
    Document {
        version: LATEST_VERSION,
        name: name.to_string(),
        elements,
        connections,
    }
}

fn element_fields(element: &Element) -> Fields {
    let v = match element {
        Element::InletReservoir(r) => json!({
            "level_h": r.level.value,
            "pipe_z": r.invert.value,
        }),
        Element::OutletReservoir(r) => json!({
            "level_h": r.level.value,
            "level_z": r.invert.value,
        }),
        Element::Pipe(p) => json!({
            "diameter": p.diameter.value,
            "length": p.length.value,
            "celerity": p.wave_celerity.value,
            "manning_n": p.manning_n,
            "inlet_h1": p.initial_head.value,
            "inlet_q1": p.initial_flow.value,
            "nodes_n": p.reaches,
            "dt_max": p.dt_max_s().unwrap_or(0.0),
        }),
        Element::Valve(v) => json!({
            "diameter": v.diameter.value,
            "loss_coefficient": v.loss_coefficient,
            "loss_factor": v.loss_exponent,
            "elevation_z": v.elevation.value,
            "custom_values": v.opening_schedule.points().iter().map(|&(t, y)| [t, y]).collect::<Vec<_>>(),
        }),
        Element::Manifold(mf) => json!({ "elev_z": mf.elevation.value }),
        Element::SurgeTank(st) => json!({
            "throttle_ao": st.throttle_area.value,
            "stank_a": st.tank_area.value,
            "throttle_kin": st.throttle_k_in,
            "throttle_kout": st.throttle_k_out,
            "throttle_el_zo": st.base_elevation.value,
        }),
        Element::Turbine(t) => {
            let g = &t.governor;
            json!({
                "ho": t.rated_head.value,
                "qo": t.rated_flow.value,
                "do": t.rated_diameter.value,
                "no": to_rpm(t.rated_speed),
                "jn": t.inertia.value,
                "efficiency_np": t.efficiency,
                "z_elev": t.elevation.value,
                "select": t.runner.as_str(),
                "governor": {
                    "delta_p": g.load_rejection_fraction * 100.0,
                    "t_load_rej": g.rejection_time_s,
                    "dt_ramp": g.ramp_time_s,
                    "tg": g.tg_s,
                    "td": g.td_s,
                    "tr": g.tr_s,
                    "bp": g.bp,
                    "kp": g.kp,
                    "gate_rate_limit": g.gate_rate_limit,
                },
            })
        }
    };
    match v {
        Value::Object(map) => map.into_iter().collect(),
        _ => Fields::new(),
    }
}
