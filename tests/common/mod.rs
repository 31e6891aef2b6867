//! Shared telegrams and helpers for the integration tests.

#![allow(dead_code)]

use std::time::Duration;

use dsmr_rs::Dispatcher;

/// The two-line telegram used throughout the DSMR documentation, with its checksum
pub const SHORT_TELEGRAM: &[u8] = b"/ISk5\\2MT382-1000\r\n1-0:1.8.0(00123.456*kWh)\r\n!CD4E\r\n";

/// A DSMR 5.0 telegram as sent by a Kaifa/Iskra meter with a gas meter on M-Bus channel 1
pub const DSMR5_TELEGRAM: &[u8] = b"/ISk5\\2MT382-1000\r\n\
\r\n\
1-3:0.2.8(50)\r\n\
0-0:1.0.0(101209113020W)\r\n\
0-0:96.1.1(4B384547303034303436333935353037)\r\n\
1-0:1.8.1(123456.789*kWh)\r\n\
1-0:1.8.2(123456.789*kWh)\r\n\
1-0:2.8.1(123456.789*kWh)\r\n\
1-0:2.8.2(123456.789*kWh)\r\n\
0-0:96.14.0(0002)\r\n\
1-0:1.7.0(01.193*kW)\r\n\
1-0:2.7.0(00.000*kW)\r\n\
0-0:96.7.21(00004)\r\n\
0-0:96.7.9(00002)\r\n\
1-0:99.97.0(2)(0-0:96.7.19)(101208152415W)(0000000240*s)(101208151004W)(0000000301*s)\r\n\
1-0:32.32.0(00002)\r\n\
1-0:32.36.0(00000)\r\n\
0-0:96.13.0(303132333435363738393A3B3C3D3E3F)\r\n\
1-0:32.7.0(220.1*V)\r\n\
1-0:31.7.0(001*A)\r\n\
1-0:21.7.0(01.111*kW)\r\n\
1-0:22.7.0(00.000*kW)\r\n\
0-1:24.1.0(003)\r\n\
0-1:96.1.0(3232323241424344313233343536373839)\r\n\
0-1:24.2.1(101209112500W)(12785.123*m3)\r\n\
!A291\r\n";

/// Bindings a typical home energy dashboard uses
pub const DASHBOARD_SENSORS: &[(&str, &str)] = &[
    ("1-0:1.8.1", "energy_delivered_tariff1"),
    ("1-0:1.8.2", "energy_delivered_tariff2"),
    ("1-0:1.7.0", "power_delivered"),
    ("1-0:32.7.0", "voltage_l1"),
    ("1-0:31.7.0", "current_l1"),
    ("0-0:96.14.0", "electricity_tariff"),
    ("0-1:24.2.1", "gas_delivered"),
];

/// Dispatcher with a 10 s validity window and the given bindings
pub fn dispatcher_with(sensors: &[(&str, &str)]) -> Dispatcher {
    let mut dispatcher = Dispatcher::new(Duration::from_secs(10), 4096);
    for (code, channel) in sensors {
        dispatcher.register(code, (*channel).into()).unwrap();
    }
    dispatcher
}
